//! Schema error types
//!
//! Error codes:
//! - PLUS_INVALID_COLLECTION (REJECT)
//! - PLUS_UNKNOWN_COLLECTION (REJECT)
//! - PLUS_INVALID_FIELD_PATH (REJECT)
//! - PLUS_DOCUMENT_INVALID (REJECT)
//! - PLUS_IDENTITY_IMMUTABLE (REJECT)
//! - PLUS_MALFORMED_SCHEMA_FILE (FATAL)

use std::fmt;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Client request rejected
    Reject,
    /// Startup must abort (loader errors)
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Collection definition is structurally invalid
    PlusInvalidCollection,
    /// Collection not registered
    PlusUnknownCollection,
    /// Field path is malformed or does not resolve
    PlusInvalidFieldPath,
    /// Document violates its collection definition
    PlusDocumentInvalid,
    /// Update tried to change the document identity
    PlusIdentityImmutable,
    /// Collection definition file could not be loaded
    PlusMalformedSchemaFile,
}

impl SchemaErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::PlusInvalidCollection => "PLUS_INVALID_COLLECTION",
            SchemaErrorCode::PlusUnknownCollection => "PLUS_UNKNOWN_COLLECTION",
            SchemaErrorCode::PlusInvalidFieldPath => "PLUS_INVALID_FIELD_PATH",
            SchemaErrorCode::PlusDocumentInvalid => "PLUS_DOCUMENT_INVALID",
            SchemaErrorCode::PlusIdentityImmutable => "PLUS_IDENTITY_IMMUTABLE",
            SchemaErrorCode::PlusMalformedSchemaFile => "PLUS_MALFORMED_SCHEMA_FILE",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            SchemaErrorCode::PlusMalformedSchemaFile => Severity::Fatal,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Validation failure details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDetails {
    /// Field path (e.g., "category.name")
    pub field: String,
    /// Expected type or condition
    pub expected: String,
    /// Actual value or type found
    pub actual: String,
}

impl ValidationDetails {
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            expected: "field to be present".into(),
            actual: "missing".into(),
        }
    }

    pub fn type_mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn null_value(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            expected: "non-null value".into(),
            actual: "null".into(),
        }
    }
}

impl fmt::Display for ValidationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field '{}': expected {}, got {}",
            self.field, self.expected, self.actual
        )
    }
}

/// Schema error type with full context
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    collection: Option<String>,
    details: Option<ValidationDetails>,
}

impl SchemaError {
    pub fn invalid_collection(reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::PlusInvalidCollection,
            message: format!("Invalid collection definition: {}", reason.into()),
            collection: None,
            details: None,
        }
    }

    pub fn unknown_collection(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            code: SchemaErrorCode::PlusUnknownCollection,
            message: format!("Collection '{}' not found", name),
            collection: Some(name),
            details: None,
        }
    }

    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::PlusInvalidFieldPath,
            message: format!("Field path '{}' {}", path.into(), reason.into()),
            collection: None,
            details: None,
        }
    }

    /// Create a validation failed error
    pub fn document_invalid(collection: impl Into<String>, details: ValidationDetails) -> Self {
        Self {
            code: SchemaErrorCode::PlusDocumentInvalid,
            message: format!("Document validation failed: {}", details),
            collection: Some(collection.into()),
            details: Some(details),
        }
    }

    pub fn identity_immutable(collection: impl Into<String>, id_key: &str) -> Self {
        Self {
            code: SchemaErrorCode::PlusIdentityImmutable,
            message: format!("Identity field '{}' cannot change after creation", id_key),
            collection: Some(collection.into()),
            details: None,
        }
    }

    /// Create an error for malformed schema file
    pub fn malformed_file(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::PlusMalformedSchemaFile,
            message: format!("Malformed schema file '{}': {}", path.into(), reason.into()),
            collection: None,
            details: None,
        }
    }

    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn details(&self) -> Option<&ValidationDetails> {
        self.details.as_ref()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
