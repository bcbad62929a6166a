//! API error types
//!
//! API errors are pass-through: store errors keep their original code and
//! HTTP status; only malformed envelopes get API-level codes.

use std::fmt;

use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    /// Request is not valid JSON or misses a required field
    PlusInvalidRequest,
    /// `op` names no known operation
    PlusUnknownOperation,
    /// Response data could not be serialized
    PlusSerializationFailed,
}

impl ApiErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ApiErrorCode::PlusInvalidRequest => "PLUS_INVALID_REQUEST",
            ApiErrorCode::PlusUnknownOperation => "PLUS_UNKNOWN_OPERATION",
            ApiErrorCode::PlusSerializationFailed => "PLUS_SERIALIZATION_FAILED",
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone)]
pub struct ApiError {
    code: String,
    http_status: u16,
    message: String,
}

impl ApiError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self {
            code: ApiErrorCode::PlusInvalidRequest.code().to_string(),
            http_status: 400,
            message: reason.into(),
        }
    }

    pub fn unknown_operation(op: impl Into<String>) -> Self {
        Self {
            code: ApiErrorCode::PlusUnknownOperation.code().to_string(),
            http_status: 400,
            message: format!("Unknown operation: {}", op.into()),
        }
    }

    pub fn serialization(err: serde_json::Error) -> Self {
        Self {
            code: ApiErrorCode::PlusSerializationFailed.code().to_string(),
            http_status: 500,
            message: err.to_string(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn http_status(&self) -> u16 {
        self.http_status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self {
            code: err.code().to_string(),
            http_status: err.status_code(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.http_status, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_error() {
        let err = ApiError::invalid_request("missing field");
        assert_eq!(err.code(), "PLUS_INVALID_REQUEST");
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn test_store_errors_pass_through() {
        let err: ApiError = StoreError::Conflict("stale revision".into()).into();
        assert_eq!(err.code(), "PLUS_CONFLICT");
        assert_eq!(err.http_status(), 409);
        assert_eq!(err.message(), "stale revision");
    }
}
