//! Aggregation error types
//!
//! Error codes:
//! - PLUS_INVALID_AGGREGATION (REJECT)
//! - PLUS_UNKNOWN_AGGREGATION (REJECT)
//! - PLUS_NON_NUMERIC_TARGET (ERROR)

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Client request rejected
    Reject,
    /// Mutation unit failed and was rolled back
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
pub enum AggregationErrorCode {
    /// Configuration is malformed (missing or non-numeric target, empty triggers)
    PlusInvalidAggregation,
    /// Configuration name not registered
    PlusUnknownAggregation,
    /// Target field holds a non-numeric value
    PlusNonNumericTarget,
}

impl AggregationErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            AggregationErrorCode::PlusInvalidAggregation => "PLUS_INVALID_AGGREGATION",
            AggregationErrorCode::PlusUnknownAggregation => "PLUS_UNKNOWN_AGGREGATION",
            AggregationErrorCode::PlusNonNumericTarget => "PLUS_NON_NUMERIC_TARGET",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            AggregationErrorCode::PlusNonNumericTarget => Severity::Error,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for AggregationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone)]
pub struct AggregationError {
    code: AggregationErrorCode,
    message: String,
}

impl AggregationError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            code: AggregationErrorCode::PlusInvalidAggregation,
            message: reason.into(),
        }
    }

    pub fn unknown(name: impl Into<String>) -> Self {
        Self {
            code: AggregationErrorCode::PlusUnknownAggregation,
            message: format!("Aggregation '{}' not found", name.into()),
        }
    }

    pub fn non_numeric(aggregation: &str, field: &str, found: &str) -> Self {
        Self {
            code: AggregationErrorCode::PlusNonNumericTarget,
            message: format!(
                "Aggregation '{}' expects a number in '{}', found {}",
                aggregation, field, found
            ),
        }
    }

    pub fn code(&self) -> AggregationErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AggregationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for AggregationError {}

pub type AggregationResult<T> = Result<T, AggregationError>;
