//! Metrics registry
//!
//! - Counters only, monotonic, reset only on process start
//! - Relaxed atomics; exact totals, no cross-counter consistency

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    writes_committed: AtomicU64,
    writes_rolled_back: AtomicU64,
    duplicate_attempts: AtomicU64,
    write_conflicts: AtomicU64,
    queries_executed: AtomicU64,
    queries_rejected: AtomicU64,
    /// Candidates examined by executed queries
    documents_scanned: AtomicU64,
    forbidden_requests: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_writes_committed(&self) {
        self.writes_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_writes_rolled_back(&self) {
        self.writes_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_duplicate_attempts(&self) {
        self.duplicate_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_write_conflicts(&self) {
        self.write_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_rejected(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_documents_scanned(&self, count: u64) {
        self.documents_scanned.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_forbidden(&self) {
        self.forbidden_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            writes_committed: self.writes_committed.load(Ordering::Relaxed),
            writes_rolled_back: self.writes_rolled_back.load(Ordering::Relaxed),
            duplicate_attempts: self.duplicate_attempts.load(Ordering::Relaxed),
            write_conflicts: self.write_conflicts.load(Ordering::Relaxed),
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            queries_rejected: self.queries_rejected.load(Ordering::Relaxed),
            documents_scanned: self.documents_scanned.load(Ordering::Relaxed),
            forbidden_requests: self.forbidden_requests.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of every counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub writes_committed: u64,
    pub writes_rolled_back: u64,
    pub duplicate_attempts: u64,
    pub write_conflicts: u64,
    pub queries_executed: u64,
    pub queries_rejected: u64,
    pub documents_scanned: u64,
    pub forbidden_requests: u64,
}
