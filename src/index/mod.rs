//! Secondary indexes
//!
//! Indexes are in-memory state derived from a collection's documents.
//!
//! # Design Principles
//!
//! - Deterministic: BTreeSet iteration order, ties broken by identity
//! - Sparse: documents missing a condition field are not indexed
//! - Typed keys: NUMBER, DATE, STRING and BOOL each order naturally
//!
//! # Invariants
//!
//! - A new index is back-filled before it becomes visible
//! - Every mutation updates every index inside the same unit
//! - A failed key extraction leaves every index untouched

mod btree;
mod definition;
mod errors;
mod key;
mod manager;

pub use btree::{EntryKey, IndexTree, KeyRange, ScanBounds};
pub use definition::{index_name, Index, IndexConfiguration};
pub use errors::{IndexError, IndexErrorCode, IndexResult};
pub use key::IndexKey;
pub use manager::{IndexDelta, IndexManager};
