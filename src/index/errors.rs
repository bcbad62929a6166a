//! Index error types
//!
//! Error codes:
//! - PLUS_INVALID_INDEX (REJECT)
//! - PLUS_UNKNOWN_INDEX (REJECT)
//! - PLUS_KEY_EXTRACTION_FAILED (REJECT)

use std::fmt;

/// Severity levels for index errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Request rejected, no state changed
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorCode {
    /// Index definition is invalid (empty conditions, bad or unresolved paths)
    PlusInvalidIndex,
    /// Index name not registered
    PlusUnknownIndex,
    /// A document or query value cannot be turned into an index key
    PlusKeyExtractionFailed,
}

impl IndexErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            IndexErrorCode::PlusInvalidIndex => "PLUS_INVALID_INDEX",
            IndexErrorCode::PlusUnknownIndex => "PLUS_UNKNOWN_INDEX",
            IndexErrorCode::PlusKeyExtractionFailed => "PLUS_KEY_EXTRACTION_FAILED",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for IndexErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Index error type with full context
#[derive(Debug, Clone)]
pub struct IndexError {
    code: IndexErrorCode,
    message: String,
    /// Index name if applicable
    index: Option<String>,
}

impl IndexError {
    pub fn invalid_index(reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::PlusInvalidIndex,
            message: reason.into(),
            index: None,
        }
    }

    pub fn unknown_index(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            code: IndexErrorCode::PlusUnknownIndex,
            message: format!("Index '{}' not found", name),
            index: Some(name),
        }
    }

    /// Create a key extraction error for a field path
    pub fn key_extraction(field: &str, reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::PlusKeyExtractionFailed,
            message: format!("Cannot index field '{}': {}", field, reason.into()),
            index: None,
        }
    }

    /// Attaches the index name
    pub fn in_index(mut self, name: impl Into<String>) -> Self {
        self.index = Some(name.into());
        self
    }

    pub fn code(&self) -> IndexErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)?;
        if let Some(index) = &self.index {
            write!(f, " (index {})", index)?;
        }
        Ok(())
    }
}

impl std::error::Error for IndexError {}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(IndexErrorCode::PlusInvalidIndex.code(), "PLUS_INVALID_INDEX");
        assert_eq!(IndexErrorCode::PlusUnknownIndex.code(), "PLUS_UNKNOWN_INDEX");
        assert_eq!(
            IndexErrorCode::PlusKeyExtractionFailed.code(),
            "PLUS_KEY_EXTRACTION_FAILED"
        );
    }

    #[test]
    fn test_error_display() {
        let err = IndexError::key_extraction("published", "not a DATE").in_index("book__published");
        let display = format!("{}", err);
        assert!(display.contains("[REJECT] PLUS_KEY_EXTRACTION_FAILED"));
        assert!(display.contains("book__published"));
    }
}
