//! JSON request API
//!
//! One request per JSON object, one response per request. The handler is
//! stateless; all state lives in the shared store and client registry.
//!
//! # Envelope
//!
//! - Request: `{"op": "...", "principal": "admin" | {"client": "id"}, ...arguments}`
//! - Success: `{"status": "ok", "data": ...}`
//! - Failure: `{"status": "error", "code": "...", "http_status": n, "message": "..."}`
//!
//! Store error codes and statuses pass through unchanged.

mod errors;
mod handler;
mod request;
mod response;

pub use errors::{ApiError, ApiErrorCode, ApiResult};
pub use handler::ApiHandler;
pub use request::{IndexSpec, Operation, RawRequest, Request};
pub use response::{ErrorResponse, Response, SuccessResponse};
