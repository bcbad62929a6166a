//! Document store
//!
//! Ties schema validation, indexes, aggregations, planning and execution
//! together behind authorization checks.
//!
//! # Concurrency
//!
//! - The catalog (collection name to partition) has its own lock
//! - Each collection's partition sits behind its own `RwLock`
//! - Mutations take the partition write lock; reads take the read lock
//! - Different collections proceed in parallel
//!
//! # Invariants
//!
//! - No reader sees a document without its index entries and aggregate deltas
//! - A denied request touches no state
//! - A retried attempt id never re-applies its deltas

mod context;
mod errors;
mod partition;
mod store;

pub use context::RequestContext;
pub use errors::{StoreError, StoreResult};
pub use partition::{AttemptLog, AttemptRecord, DocumentTable, Partition, StoredDocument, WriteOutcome};
pub use store::Store;
