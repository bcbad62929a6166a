//! API response types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::ApiError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub status: String,
    pub data: Value,
}

impl SuccessResponse {
    pub fn new(data: Value) -> Self {
        Self {
            status: "ok".to_string(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub code: String,
    pub http_status: u16,
    pub message: String,
}

impl ErrorResponse {
    pub fn from_error(err: &ApiError) -> Self {
        Self {
            status: "error".to_string(),
            code: err.code().to_string(),
            http_status: err.http_status(),
            message: err.message().to_string(),
        }
    }
}

/// Unified response type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Success(SuccessResponse),
    Error(ErrorResponse),
}

impl Response {
    pub fn success(data: Value) -> Self {
        Response::Success(SuccessResponse::new(data))
    }

    pub fn error(err: &ApiError) -> Self {
        Response::Error(ErrorResponse::from_error(err))
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Single-line JSON
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Response::Success(r) => Some(&r.data),
            Response::Error(_) => None,
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            Response::Success(_) => None,
            Response::Error(r) => Some(&r.code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let resp = Response::success(json!([{"name": "Pulp"}]));
        assert_eq!(resp.to_value(), json!({"status": "ok", "data": [{"name": "Pulp"}]}));
        assert!(resp.is_success());
    }

    #[test]
    fn test_error_shape() {
        let resp = Response::error(&ApiError::invalid_request("bad"));
        assert_eq!(
            resp.to_value(),
            json!({
                "status": "error",
                "code": "PLUS_INVALID_REQUEST",
                "http_status": 400,
                "message": "bad"
            })
        );
        assert_eq!(resp.error_code(), Some("PLUS_INVALID_REQUEST"));
        assert!(!resp.to_json().contains('\n'));
    }
}
