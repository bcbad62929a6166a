//! Observable events
//!
//! Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Process startup begins
    Startup,
    ConfigLoaded,
    /// Schema directory loaded into the catalog
    SchemasLoaded,
    /// Ready to read requests
    Serving,
    Shutdown,

    // Catalog
    CollectionCreated,
    CollectionDeleted,
    IndexCreated,
    IndexDeleted,
    AggregationCreated,
    AggregationDeleted,
    ClientAuthorized,

    // Mutations
    /// Document, index and aggregation changes swapped in
    DocumentCommitted,
    /// Aggregation value changed as part of a commit
    AggregationUpdated,
    /// Attempt id seen before; recorded outcome returned
    DuplicateAttempt,
    /// Staging failed; nothing was applied
    MutationRolledBack,
    /// Expected revision did not match
    WriteConflict,

    // Queries
    QueryPlanned,
    QueryExecuted,
    QueryRejected,

    // Access
    AccessDenied,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Startup => "PLUSDB_STARTUP_BEGIN",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemasLoaded => "SCHEMAS_LOADED",
            Event::Serving => "PLUSDB_SERVING",
            Event::Shutdown => "SHUTDOWN_COMPLETE",

            Event::CollectionCreated => "COLLECTION_CREATED",
            Event::CollectionDeleted => "COLLECTION_DELETED",
            Event::IndexCreated => "INDEX_CREATED",
            Event::IndexDeleted => "INDEX_DELETED",
            Event::AggregationCreated => "AGGREGATION_CREATED",
            Event::AggregationDeleted => "AGGREGATION_DELETED",
            Event::ClientAuthorized => "CLIENT_AUTHORIZED",

            Event::DocumentCommitted => "WRITE_COMMIT",
            Event::AggregationUpdated => "AGGREGATION_UPDATED",
            Event::DuplicateAttempt => "WRITE_DUPLICATE_ATTEMPT",
            Event::MutationRolledBack => "WRITE_ROLLED_BACK",
            Event::WriteConflict => "WRITE_CONFLICT",

            Event::QueryPlanned => "QUERY_PLANNED",
            Event::QueryExecuted => "QUERY_COMPLETE",
            Event::QueryRejected => "QUERY_REJECTED",

            Event::AccessDenied => "ACCESS_DENIED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Event::QueryPlanned | Event::AggregationUpdated => Severity::Trace,
            Event::MutationRolledBack
            | Event::WriteConflict
            | Event::QueryRejected
            | Event::AccessDenied => Severity::Warn,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
