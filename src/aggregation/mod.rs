//! Real-time aggregations
//!
//! COLLECTION_COUNT, SUM and AVG values kept current on every committed
//! document mutation whose kind is among the configuration's triggers.
//!
//! # Invariants
//!
//! - Values change only in the same unit as the triggering mutation
//! - A failed update leaves every aggregation of the collection unchanged
//! - COUNT never goes below zero

mod engine;
mod errors;
mod types;

pub use engine::{AggregationDelta, AggregationEngine};
pub use errors::{AggregationError, AggregationErrorCode, AggregationResult, Severity};
pub use types::{
    aggregation_name, AggregationConfiguration, AggregationType, AggregationValue, MutationKind,
    RunningTotal,
};
