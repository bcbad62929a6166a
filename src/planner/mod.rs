//! Query planner
//!
//! Maps a predicate onto the best-matching index, or validates an
//! explicitly named one, and produces an immutable `QueryPlan`.
//!
//! # Design Principles
//!
//! - Deterministic: same inputs produce the same plan
//! - Explicit indexes are validated, never silently replaced
//! - Leaves the index cannot serve become a residual filter
//!
//! # Index Selection
//!
//! 1. Only fully constrained indexes are candidates
//! 2. Most consumed predicate leaves wins
//! 3. Ties go to declaration order
//! 4. No candidate: full scan in identity order

mod ast;
mod errors;
mod explain;
mod planner;

pub use ast::{Conjunction, EqLeaf, Predicate, Query, RangeLeaf};
pub use errors::{PlannerError, PlannerErrorCode, PlannerResult};
pub use explain::ExplainPlan;
pub use planner::{FieldFilter, FilterKind, IndexCatalog, QueryPlan, QueryPlanner, ScanType};
