//! Loads collection definitions from disk at startup
//!
//! - One `*.json` file per collection definition
//! - Files are loaded in file-name order
//! - Unreadable, malformed or structurally invalid files are FATAL

use std::fs;
use std::path::{Path, PathBuf};

use super::errors::{SchemaError, SchemaResult};
use super::types::Collection;

/// Reads collection definition files from a directory.
pub struct SchemaLoader {
    schema_dir: PathBuf,
}

impl SchemaLoader {
    pub fn new(schema_dir: impl Into<PathBuf>) -> Self {
        Self {
            schema_dir: schema_dir.into(),
        }
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Loads every collection definition in the directory.
    pub fn load_dir(&self) -> SchemaResult<Vec<Collection>> {
        let dir_name = self.schema_dir.display().to_string();
        let entries = fs::read_dir(&self.schema_dir).map_err(|e| {
            SchemaError::malformed_file(&dir_name, format!("Failed to read schema directory: {}", e))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                SchemaError::malformed_file(&dir_name, format!("Failed to read directory entry: {}", e))
            })?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut collections: Vec<Collection> = Vec::with_capacity(paths.len());
        for path in paths {
            let collection = Self::load_file(&path)?;
            if collections.iter().any(|c| c.name == collection.name) {
                return Err(SchemaError::malformed_file(
                    path.display().to_string(),
                    format!("collection '{}' is defined twice", collection.name),
                ));
            }
            collections.push(collection);
        }
        Ok(collections)
    }

    fn load_file(path: &Path) -> SchemaResult<Collection> {
        let name = path.display().to_string();
        let content = fs::read_to_string(path)
            .map_err(|e| SchemaError::malformed_file(&name, format!("Failed to read file: {}", e)))?;

        let collection: Collection = serde_json::from_str(&content)
            .map_err(|e| SchemaError::malformed_file(&name, format!("Invalid JSON: {}", e)))?;

        collection
            .validate_structure()
            .map_err(|e| SchemaError::malformed_file(&name, e.message()))?;

        Ok(collection)
    }
}
