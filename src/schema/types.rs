//! Collection and field definitions
//!
//! Supported field types:
//! - STRING: UTF-8 string
//! - NUMBER: any JSON number
//! - DATE: RFC 3339 timestamp, `YYYY-MM-DD` date, or integer epoch millis
//! - OBJECT: nested object, optionally with declared nested fields

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use super::errors::{SchemaError, SchemaResult};
use super::path;

/// Declared field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    String,
    Number,
    Date,
    Object,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "STRING",
            FieldType::Number => "NUMBER",
            FieldType::Date => "DATE",
            FieldType::Object => "OBJECT",
        }
    }
}

/// Field constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Constraint {
    NotNull,
}

/// A node of the recursive field tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    /// Only meaningful for OBJECT fields; `None` leaves the object open
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_fields: Option<Vec<FieldDef>>,
}

impl FieldDef {
    fn of(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            constraints: Vec::new(),
            nested_fields: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::of(name, FieldType::String)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::of(name, FieldType::Number)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::of(name, FieldType::Date)
    }

    /// Create an object field with declared nested fields
    pub fn object(name: impl Into<String>, nested: Vec<FieldDef>) -> Self {
        Self {
            nested_fields: Some(nested),
            ..Self::of(name, FieldType::Object)
        }
    }

    /// Create an object field that accepts any nested content
    pub fn open_object(name: impl Into<String>) -> Self {
        Self::of(name, FieldType::Object)
    }

    /// Adds the NOT_NULL constraint
    pub fn not_null(mut self) -> Self {
        if !self.is_not_null() {
            self.constraints.push(Constraint::NotNull);
        }
        self
    }

    pub fn is_not_null(&self) -> bool {
        self.constraints.contains(&Constraint::NotNull)
    }

    fn validate_structure(&self, prefix: &str) -> SchemaResult<()> {
        let full = path::make_path(prefix, &self.name);
        if !path::is_valid_name(&self.name) {
            return Err(SchemaError::invalid_collection(format!(
                "field name '{}' is not a valid path segment",
                full
            )));
        }
        match (&self.field_type, &self.nested_fields) {
            (FieldType::Object, Some(nested)) => validate_fields(nested, &full),
            (_, Some(_)) => Err(SchemaError::invalid_collection(format!(
                "field '{}' declares nested fields but is not OBJECT",
                full
            ))),
            (_, None) => Ok(()),
        }
    }
}

fn validate_fields(fields: &[FieldDef], prefix: &str) -> SchemaResult<()> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::invalid_collection(format!(
                "duplicate field '{}'",
                path::make_path(prefix, &field.name)
            )));
        }
        field.validate_structure(prefix)?;
    }
    Ok(())
}

/// How a field path resolves against a collection definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathResolution<'a> {
    /// Every segment is declared
    Declared(&'a FieldDef),
    /// The path falls under an open collection or open object
    Open,
    /// The path leaves the declared tree
    Unresolved,
}

/// A collection definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub name: String,
    /// Field holding the document identity
    pub id_key: String,
    #[serde(default)]
    pub auto_generate_id: bool,
    /// Declared fields; empty means the collection is open
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl Collection {
    /// Create an open collection (no declared fields)
    pub fn new(name: impl Into<String>, id_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_key: id_key.into(),
            auto_generate_id: false,
            fields: Vec::new(),
        }
    }

    pub fn with_fields(mut self, fields: Vec<FieldDef>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_auto_generated_id(mut self) -> Self {
        self.auto_generate_id = true;
        self
    }

    pub fn is_open(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validates the definition itself (not a document)
    pub fn validate_structure(&self) -> SchemaResult<()> {
        if self.name.is_empty() {
            return Err(SchemaError::invalid_collection("collection name is empty"));
        }
        if !path::is_valid_name(&self.name) || self.name.contains("__") {
            return Err(SchemaError::invalid_collection(format!(
                "collection name '{}' must be a single identifier without '__'",
                self.name
            )));
        }
        if !path::is_valid_name(&self.id_key) {
            return Err(SchemaError::invalid_collection(format!(
                "id key '{}' must be a top-level field name",
                self.id_key
            )));
        }
        validate_fields(&self.fields, "")?;

        if let Some(id_field) = self.fields.iter().find(|f| f.name == self.id_key) {
            if !matches!(id_field.field_type, FieldType::String | FieldType::Number) {
                return Err(SchemaError::invalid_collection(format!(
                    "id key '{}' must be STRING or NUMBER",
                    self.id_key
                )));
            }
        }
        Ok(())
    }

    /// Resolves a dotted path through the declared field tree.
    pub fn resolve_path(&self, path: &str) -> PathResolution<'_> {
        if self.is_open() {
            return PathResolution::Open;
        }
        let mut fields = self.fields.as_slice();
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            let Some(field) = fields.iter().find(|f| f.name == segment) else {
                return PathResolution::Unresolved;
            };
            if segments.peek().is_none() {
                return PathResolution::Declared(field);
            }
            match (&field.field_type, &field.nested_fields) {
                (FieldType::Object, Some(nested)) => fields = nested,
                (FieldType::Object, None) => return PathResolution::Open,
                _ => return PathResolution::Unresolved,
            }
        }
        PathResolution::Unresolved
    }

    /// Declared type of a path, if every segment is declared
    pub fn declared_type(&self, path: &str) -> Option<FieldType> {
        match self.resolve_path(path) {
            PathResolution::Declared(field) => Some(field.field_type),
            _ => None,
        }
    }
}

/// Parses a DATE value into epoch milliseconds.
///
/// Accepts RFC 3339 timestamps, plain `YYYY-MM-DD` dates (midnight UTC)
/// and integer epoch millis.
pub fn date_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => {
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Some(ts.timestamp_millis());
            }
            let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
            Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn book() -> Collection {
        Collection::new("book", "isbn").with_fields(vec![
            FieldDef::string("isbn").not_null(),
            FieldDef::string("title"),
            FieldDef::object("category", vec![FieldDef::string("name")]),
            FieldDef::open_object("extra"),
        ])
    }

    #[test]
    fn test_structure_valid() {
        assert!(book().validate_structure().is_ok());
        assert!(Collection::new("category", "name").validate_structure().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(Collection::new("", "id").validate_structure().is_err());
    }

    #[test]
    fn test_double_underscore_name_rejected() {
        assert!(Collection::new("a__b", "id").validate_structure().is_err());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let c = Collection::new("c", "id")
            .with_fields(vec![FieldDef::string("a"), FieldDef::number("a")]);
        let err = c.validate_structure().unwrap_err();
        assert!(err.message().contains("duplicate"));
    }

    #[test]
    fn test_nested_fields_only_on_object() {
        let mut bad = FieldDef::string("a");
        bad.nested_fields = Some(vec![FieldDef::string("b")]);
        let c = Collection::new("c", "id").with_fields(vec![bad]);
        assert!(c.validate_structure().is_err());
    }

    #[test]
    fn test_id_key_must_be_scalar() {
        let c = Collection::new("c", "id").with_fields(vec![FieldDef::date("id")]);
        assert!(c.validate_structure().is_err());
    }

    #[test]
    fn test_resolve_path() {
        let c = book();
        assert!(matches!(c.resolve_path("title"), PathResolution::Declared(_)));
        assert!(matches!(c.resolve_path("category.name"), PathResolution::Declared(_)));
        assert_eq!(c.resolve_path("category.other"), PathResolution::Unresolved);
        assert_eq!(c.resolve_path("extra.anything"), PathResolution::Open);
        assert_eq!(c.resolve_path("title.x"), PathResolution::Unresolved);
        assert_eq!(c.resolve_path("author"), PathResolution::Unresolved);
        assert_eq!(Collection::new("o", "id").resolve_path("a.b"), PathResolution::Open);
    }

    #[test]
    fn test_wire_shape() {
        let c: Collection = serde_json::from_value(json!({
            "name": "review",
            "idKey": "id",
            "autoGenerateId": true,
            "fields": [
                {"name": "rate", "type": "NUMBER", "constraints": ["NOT_NULL"]},
                {"name": "meta", "type": "OBJECT", "nestedFields": [{"name": "src", "type": "STRING"}]}
            ]
        }))
        .unwrap();
        assert!(c.auto_generate_id);
        assert!(c.fields[0].is_not_null());
        assert_eq!(c.declared_type("meta.src"), Some(FieldType::String));
    }

    #[test]
    fn test_date_millis() {
        assert_eq!(date_millis(&json!(1000)), Some(1000));
        assert_eq!(date_millis(&json!("1970-01-01T00:00:01Z")), Some(1000));
        assert_eq!(date_millis(&json!("1970-01-02")), Some(86_400_000));
        assert_eq!(date_millis(&json!("not a date")), None);
        assert_eq!(date_millis(&json!(true)), None);
    }
}
