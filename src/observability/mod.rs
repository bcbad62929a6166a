//! Observability subsystem
//!
//! Structured JSON logging, typed events and counters.
//!
//! # Rules
//!
//! 1. Logging never changes a request's outcome
//! 2. Log lines go to stderr; stdout carries responses only
//! 3. Fields are emitted in key order

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{render, Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
