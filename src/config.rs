//! Store configuration
//!
//! Loaded from a JSON file; every field has a default so an empty object
//! is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Page size applied when a request names none; unbounded when unset
    #[serde(default)]
    pub default_page_size: Option<usize>,

    /// Requested page sizes above this are clamped
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Applied attempt ids remembered per collection
    #[serde(default = "default_attempt_log_capacity")]
    pub attempt_log_capacity: usize,

    /// Directory of collection schema files loaded at startup
    #[serde(default)]
    pub schema_dir: Option<PathBuf>,

    /// Silence per-request INFO log lines
    #[serde(default)]
    pub quiet: bool,
}

fn default_max_page_size() -> usize {
    1000
}

fn default_attempt_log_capacity() -> usize {
    1024
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_page_size: None,
            max_page_size: default_max_page_size(),
            attempt_log_capacity: default_attempt_log_capacity(),
            schema_dir: None,
            quiet: false,
        }
    }
}

impl StoreConfig {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: StoreConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_page_size == 0 {
            return Err(ConfigError::Invalid("max_page_size must be > 0".into()));
        }
        match self.default_page_size {
            Some(0) => {
                return Err(ConfigError::Invalid("default_page_size must be > 0".into()));
            }
            Some(size) if size > self.max_page_size => {
                return Err(ConfigError::Invalid(format!(
                    "default_page_size {} exceeds max_page_size {}",
                    size, self.max_page_size
                )));
            }
            _ => {}
        }
        Ok(())
    }
}
