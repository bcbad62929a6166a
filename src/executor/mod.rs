//! Query executor and pagination
//!
//! The executor consumes plans and produces deterministic pages.
//!
//! # Execution Flow (strict order)
//!
//! 1. Verify the cursor belongs to the plan's scan
//! 2. Walk index entries (or identities) strictly after the cursor
//! 3. Fetch documents and apply residual filters
//! 4. Cut the page and encode the resume position
//!
//! # Invariants
//!
//! - Deterministic execution
//! - Items are never skipped or repeated across pages of a stable ordering
//! - `last_key` is present exactly when more items remain

mod cursor;
mod errors;
mod executor;
mod filters;
mod result;

pub use cursor::{Cursor, ScanPosition};
pub use errors::{ExecutorError, ExecutorErrorCode, ExecutorResult};
pub use executor::{paginate, resolve_page_size, DocumentSource, IndexLookup, QueryExecutor};
pub use filters::PredicateFilter;
pub use result::{ExecutionResult, PaginatedResult};
