//! plusdb - a document store with secondary-index queries, cursor
//! pagination and real-time aggregations
//!
//! Writes update documents, index entries and aggregate values as one
//! unit; queries are planned against the collection's indexes and paged
//! with opaque cursors.

pub mod aggregation;
pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod executor;
pub mod index;
pub mod observability;
pub mod planner;
pub mod schema;
pub mod store;
