//! Document validation against a collection definition
//!
//! Validation semantics:
//! - The document is a JSON object
//! - NOT_NULL fields are present and non-null
//! - Declared types match exactly, recursively through OBJECT fields
//! - Undeclared fields are allowed
//!
//! The validator never mutates documents and is deterministic.

use serde_json::{Map, Value};

use super::errors::{SchemaError, SchemaResult, ValidationDetails};
use super::path::make_path;
use super::types::{date_millis, Collection, FieldDef, FieldType};

/// Validates documents for one collection.
pub struct SchemaValidator<'a> {
    collection: &'a Collection,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(collection: &'a Collection) -> Self {
        Self { collection }
    }

    /// Validates a document against the collection's declared fields.
    ///
    /// # Errors
    ///
    /// Returns `PLUS_DOCUMENT_INVALID` naming the first offending field.
    pub fn validate_document(&self, document: &Value) -> SchemaResult<()> {
        let obj = document.as_object().ok_or_else(|| {
            self.invalid(ValidationDetails::type_mismatch(
                "$root",
                "object",
                json_type_name(document),
            ))
        })?;
        self.validate_object(obj, &self.collection.fields, "")
    }

    /// Validates a replacement document, checking identity immutability.
    pub fn validate_update(&self, existing_id: &str, document: &Value) -> SchemaResult<()> {
        self.validate_document(document)?;
        match self.identity(document)? {
            Some(new_id) if new_id != existing_id => Err(SchemaError::identity_immutable(
                &self.collection.name,
                &self.collection.id_key,
            )),
            _ => Ok(()),
        }
    }

    /// Extracts the identity value as a string.
    ///
    /// Returns `Ok(None)` when the identity field is absent or null.
    pub fn identity(&self, document: &Value) -> SchemaResult<Option<String>> {
        let id_key = &self.collection.id_key;
        match document.get(id_key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if !s.is_empty() => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(self.invalid(ValidationDetails::type_mismatch(
                id_key.as_str(),
                "non-empty string or number",
                json_type_name(other),
            ))),
        }
    }

    fn validate_object(
        &self,
        obj: &Map<String, Value>,
        fields: &[FieldDef],
        path_prefix: &str,
    ) -> SchemaResult<()> {
        for field in fields {
            let field_path = make_path(path_prefix, &field.name);
            match obj.get(&field.name) {
                None if field.is_not_null() => {
                    return Err(self.invalid(ValidationDetails::missing_field(field_path)));
                }
                Some(Value::Null) if field.is_not_null() => {
                    return Err(self.invalid(ValidationDetails::null_value(field_path)));
                }
                None | Some(Value::Null) => {}
                Some(value) => self.validate_value(value, field, &field_path)?,
            }
        }
        Ok(())
    }

    fn validate_value(&self, value: &Value, field: &FieldDef, field_path: &str) -> SchemaResult<()> {
        let ok = match field.field_type {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Date => match value {
                Value::String(_) => date_millis(value).is_some(),
                Value::Number(n) => n.is_i64(),
                _ => false,
            },
            FieldType::Object => {
                let obj = value.as_object().ok_or_else(|| self.type_error(field_path, field, value))?;
                if let Some(nested) = &field.nested_fields {
                    self.validate_object(obj, nested, field_path)?;
                }
                true
            }
        };
        if ok {
            Ok(())
        } else {
            Err(self.type_error(field_path, field, value))
        }
    }

    fn type_error(&self, field_path: &str, field: &FieldDef, actual: &Value) -> SchemaError {
        self.invalid(ValidationDetails::type_mismatch(
            field_path,
            field.field_type.type_name(),
            json_type_name(actual),
        ))
    }

    fn invalid(&self, details: ValidationDetails) -> SchemaError {
        SchemaError::document_invalid(&self.collection.name, details)
    }
}

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
