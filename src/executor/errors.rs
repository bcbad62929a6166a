//! Executor error types
//!
//! Error codes:
//! - PLUS_INVALID_CURSOR (REJECT)
//! - PLUS_INVALID_PAGE_SIZE (REJECT)
//! - PLUS_EXECUTION_FAILED (ERROR)

use std::fmt;

/// Severity levels for executor errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Client request rejected
    Reject,
    /// Operation failed on internal state
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorErrorCode {
    /// Cursor is malformed, fails its checksum, or belongs to another scan
    PlusInvalidCursor,
    /// Page size of zero
    PlusInvalidPageSize,
    /// Index and documents disagree, or a cursor cannot be encoded
    PlusExecutionFailed,
}

impl ExecutorErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorErrorCode::PlusInvalidCursor => "PLUS_INVALID_CURSOR",
            ExecutorErrorCode::PlusInvalidPageSize => "PLUS_INVALID_PAGE_SIZE",
            ExecutorErrorCode::PlusExecutionFailed => "PLUS_EXECUTION_FAILED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ExecutorErrorCode::PlusExecutionFailed => Severity::Error,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for ExecutorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Executor error type with full context
#[derive(Debug, Clone)]
pub struct ExecutorError {
    code: ExecutorErrorCode,
    message: String,
}

impl ExecutorError {
    pub fn invalid_cursor(reason: impl Into<String>) -> Self {
        Self {
            code: ExecutorErrorCode::PlusInvalidCursor,
            message: format!("Invalid cursor: {}", reason.into()),
        }
    }

    pub fn invalid_page_size() -> Self {
        Self {
            code: ExecutorErrorCode::PlusInvalidPageSize,
            message: "Page size must be positive".into(),
        }
    }

    pub fn execution_failed(reason: impl Into<String>) -> Self {
        Self {
            code: ExecutorErrorCode::PlusExecutionFailed,
            message: reason.into(),
        }
    }

    pub fn code(&self) -> ExecutorErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for ExecutorError {}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ExecutorErrorCode::PlusInvalidCursor.code(), "PLUS_INVALID_CURSOR");
        assert_eq!(ExecutorErrorCode::PlusInvalidPageSize.code(), "PLUS_INVALID_PAGE_SIZE");
        assert_eq!(ExecutorErrorCode::PlusExecutionFailed.code(), "PLUS_EXECUTION_FAILED");
    }

    #[test]
    fn test_severity() {
        assert_eq!(ExecutorError::invalid_page_size().severity(), Severity::Reject);
        assert_eq!(
            ExecutorError::execution_failed("missing document").severity(),
            Severity::Error
        );
    }
}
