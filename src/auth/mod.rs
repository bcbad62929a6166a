//! # Auth Module
//!
//! Client authorizations and per-collection scope checks.
//!
//! The admin principal passes every check. Clients act only within the
//! scopes granted to them and never manage collections, indexes,
//! aggregations or other clients.

pub mod authorizer;
pub mod errors;
pub mod scope;

pub use authorizer::{Authorizer, ScopeAuthorizer};
pub use errors::{AuthError, AuthResult};
pub use scope::{ClientAuthorization, ClientScope, Principal, ScopeType};
