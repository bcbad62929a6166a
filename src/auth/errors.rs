//! # Auth Errors
//!
//! Error types for the authorization module.

use thiserror::Error;

use super::scope::ScopeType;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Authorization errors
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    // ==================
    // Access Errors
    // ==================

    /// Client lacks the scope for this collection
    #[error("Client '{client}' may not {scope} on collection '{collection}'")]
    ScopeDenied {
        client: String,
        collection: String,
        scope: ScopeType,
    },

    /// Operation reserved to the admin principal
    #[error("Client '{client}' may not {action}")]
    AdminRequired { client: String, action: String },

    // ==================
    // Registry Errors
    // ==================

    /// No authorization registered for this client id
    #[error("Client '{0}' not found")]
    UnknownClient(String),

    /// Malformed client authorization
    #[error("Invalid client authorization: {0}")]
    InvalidAuthorization(String),

    // ==================
    // Internal Errors
    // ==================

    /// Registry lock was poisoned by a panicking writer
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl AuthError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::InvalidAuthorization(_) => 400,

            AuthError::ScopeDenied { .. } => 403,
            AuthError::AdminRequired { .. } => 403,

            AuthError::UnknownClient(_) => 404,

            AuthError::StorageError(_) => 500,
        }
    }

    /// True for denials of an otherwise well-formed request
    pub fn is_denial(&self) -> bool {
        self.status_code() == 403
    }
}
