//! Planner error types
//!
//! Error codes:
//! - PLUS_QUERY_INVALID (REJECT)
//! - PLUS_INDEX_MISMATCH (REJECT)
//! - PLUS_UNKNOWN_INDEX (REJECT)

use std::fmt;

/// Severity levels for planner errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Client request rejected
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Planner-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerErrorCode {
    /// Malformed predicate or query value
    PlusQueryInvalid,
    /// Predicate does not fit the named index
    PlusIndexMismatch,
    /// Named index does not exist on the collection
    PlusUnknownIndex,
}

impl PlannerErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::PlusQueryInvalid => "PLUS_QUERY_INVALID",
            PlannerErrorCode::PlusIndexMismatch => "PLUS_INDEX_MISMATCH",
            PlannerErrorCode::PlusUnknownIndex => "PLUS_UNKNOWN_INDEX",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for PlannerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Planner error type with full context
#[derive(Debug, Clone)]
pub struct PlannerError {
    code: PlannerErrorCode,
    message: String,
    /// Field name if applicable
    field: Option<String>,
}

impl PlannerError {
    pub fn query_invalid(reason: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::PlusQueryInvalid,
            message: reason.into(),
            field: None,
        }
    }

    /// Create an index mismatch error for the offending field
    pub fn index_mismatch(index: &str, field: impl Into<String>, reason: &str) -> Self {
        let f = field.into();
        Self {
            code: PlannerErrorCode::PlusIndexMismatch,
            message: format!("Predicate on '{}' does not fit index '{}': {}", f, index, reason),
            field: Some(f),
        }
    }

    pub fn unknown_index(name: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::PlusUnknownIndex,
            message: format!("Index '{}' not found", name.into()),
            field: None,
        }
    }

    pub fn code(&self) -> PlannerErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for PlannerError {}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;
