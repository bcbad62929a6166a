//! Collection definitions and document validation
//!
//! Collections carry a recursive typed field tree. Validation happens at
//! write time, before any index or aggregation work.
//!
//! # Design Principles
//!
//! - Undeclared fields are allowed; declared fields must match their type
//! - NOT_NULL is the only constraint
//! - A collection with no declared fields is open
//! - Validation is deterministic and never mutates documents

mod errors;
mod loader;
pub mod path;
mod types;
mod validator;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, Severity, ValidationDetails};
pub use loader::SchemaLoader;
pub use types::{date_millis, Collection, Constraint, FieldDef, FieldType, PathResolution};
pub use validator::{json_type_name, SchemaValidator};
