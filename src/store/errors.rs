//! Store errors
//!
//! Every module error folds into one of six kinds:
//!
//! | Kind          | HTTP | Retryable |
//! |---------------|------|-----------|
//! | Validation    | 400  | no        |
//! | IndexMismatch | 400  | no        |
//! | NotFound      | 404  | no        |
//! | Forbidden     | 403  | no        |
//! | Conflict      | 409  | yes       |
//! | Internal      | 500  | no        |
//!
//! The kind decides the status; `code()` keeps the originating module's
//! error code.

use thiserror::Error;

use crate::aggregation::{AggregationError, AggregationErrorCode};
use crate::auth::AuthError;
use crate::executor::{ExecutorError, ExecutorErrorCode};
use crate::index::{IndexError, IndexErrorCode};
use crate::planner::{PlannerError, PlannerErrorCode};
use crate::schema::{SchemaError, SchemaErrorCode};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{message}")]
    Validation { code: &'static str, message: String },

    #[error("{message}")]
    IndexMismatch { code: &'static str, message: String },

    #[error("{message}")]
    NotFound { code: &'static str, message: String },

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{message}")]
    Internal { code: &'static str, message: String },
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation {
            code: "PLUS_VALIDATION_FAILED",
            message: message.into(),
        }
    }

    pub fn not_found(what: &str, name: &str) -> Self {
        StoreError::NotFound {
            code: "PLUS_NOT_FOUND",
            message: format!("{} '{}' not found", what, name),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        StoreError::Internal {
            code: "PLUS_INTERNAL",
            message: message.into(),
        }
    }

    /// A lock was poisoned by a panicking holder
    pub fn poisoned(what: &str) -> Self {
        Self::internal(format!("{} lock poisoned", what))
    }

    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Validation { code, .. }
            | StoreError::IndexMismatch { code, .. }
            | StoreError::NotFound { code, .. }
            | StoreError::Internal { code, .. } => code,
            StoreError::Forbidden(_) => "PLUS_FORBIDDEN",
            StoreError::Conflict(_) => "PLUS_CONFLICT",
        }
    }

    /// Taxonomy name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Validation { .. } => "ValidationError",
            StoreError::IndexMismatch { .. } => "IndexMismatch",
            StoreError::NotFound { .. } => "NotFound",
            StoreError::Forbidden(_) => "Forbidden",
            StoreError::Conflict(_) => "Conflict",
            StoreError::Internal { .. } => "Internal",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::Validation { .. } | StoreError::IndexMismatch { .. } => 400,
            StoreError::Forbidden(_) => 403,
            StoreError::NotFound { .. } => 404,
            StoreError::Conflict(_) => 409,
            StoreError::Internal { .. } => 500,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<SchemaError> for StoreError {
    fn from(err: SchemaError) -> Self {
        let code = err.code().code();
        let message = err.message().to_string();
        match err.code() {
            SchemaErrorCode::PlusUnknownCollection => StoreError::NotFound { code, message },
            SchemaErrorCode::PlusMalformedSchemaFile => StoreError::Internal { code, message },
            _ => StoreError::Validation { code, message },
        }
    }
}

impl From<IndexError> for StoreError {
    fn from(err: IndexError) -> Self {
        let code = err.code().code();
        let message = err.message().to_string();
        match err.code() {
            IndexErrorCode::PlusInvalidIndex => StoreError::Validation { code, message },
            IndexErrorCode::PlusUnknownIndex => StoreError::NotFound { code, message },
            IndexErrorCode::PlusKeyExtractionFailed => StoreError::Internal { code, message },
        }
    }
}

impl From<PlannerError> for StoreError {
    fn from(err: PlannerError) -> Self {
        let code = err.code().code();
        let message = err.message().to_string();
        match err.code() {
            PlannerErrorCode::PlusQueryInvalid => StoreError::Validation { code, message },
            PlannerErrorCode::PlusIndexMismatch => StoreError::IndexMismatch { code, message },
            PlannerErrorCode::PlusUnknownIndex => StoreError::NotFound { code, message },
        }
    }
}

impl From<ExecutorError> for StoreError {
    fn from(err: ExecutorError) -> Self {
        let code = err.code().code();
        let message = err.message().to_string();
        match err.code() {
            ExecutorErrorCode::PlusExecutionFailed => StoreError::Internal { code, message },
            _ => StoreError::Validation { code, message },
        }
    }
}

impl From<AggregationError> for StoreError {
    fn from(err: AggregationError) -> Self {
        let code = err.code().code();
        let message = err.message().to_string();
        match err.code() {
            AggregationErrorCode::PlusInvalidAggregation => StoreError::Validation { code, message },
            AggregationErrorCode::PlusUnknownAggregation => StoreError::NotFound { code, message },
            AggregationErrorCode::PlusNonNumericTarget => StoreError::Internal { code, message },
        }
    }
}

impl From<AuthError> for StoreError {
    fn from(err: AuthError) -> Self {
        match &err {
            AuthError::ScopeDenied { .. } | AuthError::AdminRequired { .. } => {
                StoreError::Forbidden(err.to_string())
            }
            AuthError::UnknownClient(_) => StoreError::NotFound {
                code: "PLUS_UNKNOWN_CLIENT",
                message: err.to_string(),
            },
            AuthError::InvalidAuthorization(_) => StoreError::Validation {
                code: "PLUS_INVALID_CLIENT",
                message: err.to_string(),
            },
            AuthError::StorageError(_) => StoreError::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ScopeType;

    #[test]
    fn test_status_codes() {
        assert_eq!(StoreError::validation("x").status_code(), 400);
        assert_eq!(StoreError::not_found("collection", "book").status_code(), 404);
        assert_eq!(StoreError::Forbidden("no".into()).status_code(), 403);
        assert_eq!(StoreError::Conflict("stale".into()).status_code(), 409);
        assert_eq!(StoreError::internal("boom").status_code(), 500);
    }

    #[test]
    fn test_only_conflict_is_retryable() {
        assert!(StoreError::Conflict("stale".into()).is_retryable());
        assert!(!StoreError::internal("boom").is_retryable());
        assert!(!StoreError::validation("bad").is_retryable());
    }

    #[test]
    fn test_planner_mapping_keeps_code() {
        let err: StoreError = PlannerError::index_mismatch("book__author", "title", "not a condition").into();
        assert_eq!(err.kind(), "IndexMismatch");
        assert_eq!(err.code(), "PLUS_INDEX_MISMATCH");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_aggregation_failure_is_internal() {
        let err: StoreError = AggregationError::non_numeric("b__sum__amount", "amount", "string").into();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.code(), "PLUS_NON_NUMERIC_TARGET");
    }

    #[test]
    fn test_denial_is_forbidden() {
        let err: StoreError = AuthError::ScopeDenied {
            client: "c".into(),
            collection: "book".into(),
            scope: ScopeType::Create,
        }
        .into();
        assert_eq!(err.kind(), "Forbidden");
        assert!(err.to_string().contains("CREATE"));
    }
}
