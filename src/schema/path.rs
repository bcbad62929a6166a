//! Dotted field paths (`category.name`, `address.city`)

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use super::errors::{SchemaError, SchemaResult};

static FIELD_PATH: OnceLock<Regex> = OnceLock::new();
static FIELD_NAME: OnceLock<Regex> = OnceLock::new();

fn field_path_re() -> &'static Regex {
    FIELD_PATH.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-]*(\.[A-Za-z_][A-Za-z0-9_\-]*)*$")
            .expect("valid field path regex")
    })
}

fn field_name_re() -> &'static Regex {
    FIELD_NAME.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-]*$").expect("valid field name regex")
    })
}

/// Returns true if `path` is a syntactically valid dotted field path.
pub fn is_valid_path(path: &str) -> bool {
    field_path_re().is_match(path)
}

/// Returns true if `name` is a single path segment.
pub fn is_valid_name(name: &str) -> bool {
    field_name_re().is_match(name)
}

pub fn validate_path(path: &str) -> SchemaResult<()> {
    if is_valid_path(path) {
        Ok(())
    } else {
        Err(SchemaError::invalid_path(path, "is not a valid dotted field path"))
    }
}

/// Builds a nested path for error reporting.
pub fn make_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

/// Resolves a dotted path against a JSON document.
///
/// Returns `None` when any segment is missing or traverses a non-object.
pub fn lookup<'v>(document: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.as_object()?.get(segment))
}

/// Collects every field path present on a document, including object
/// prefixes (`category` and `category.name`).
pub fn collect_paths(document: &Value, out: &mut BTreeSet<String>) {
    collect_into(document, "", out);
}

fn collect_into(value: &Value, prefix: &str, out: &mut BTreeSet<String>) {
    if let Some(obj) = value.as_object() {
        for (key, child) in obj {
            let path = make_path(prefix, key);
            collect_into(child, &path, out);
            out.insert(path);
        }
    }
}
