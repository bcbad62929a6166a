//! Per-collection state
//!
//! A partition holds everything one collection owns: documents, indexes,
//! aggregations and the attempt log. The store keeps each partition behind
//! its own lock.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::ops::Bound;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregation::{AggregationEngine, MutationKind};
use crate::executor::DocumentSource;
use crate::index::IndexManager;
use crate::schema::Collection;

/// A committed document and its revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    /// Starts at 1, bumped by every update
    pub revision: u64,
    pub document: Value,
}

/// Outcome of an applied mutation, replayed for duplicate attempts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOutcome {
    pub id: String,
    pub revision: u64,
    /// Stored document after the write; absent after a delete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Value>,
    /// True when the attempt id had already been applied
    pub duplicate: bool,
}

/// Documents in identity order
#[derive(Debug, Clone, Default)]
pub struct DocumentTable {
    rows: BTreeMap<String, StoredDocument>,
}

impl DocumentTable {
    pub fn get(&self, id: &str) -> Option<&StoredDocument> {
        self.rows.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    pub fn put(&mut self, row: StoredDocument) {
        self.rows.insert(row.id.clone(), row);
    }

    pub fn remove(&mut self, id: &str) -> Option<StoredDocument> {
        self.rows.remove(id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(id, body)` pairs in identity order
    pub fn bodies(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.rows.iter().map(|(id, row)| (id.as_str(), &row.document))
    }
}

impl DocumentSource for DocumentTable {
    fn scan_after<'a>(&'a self, after: Option<&str>) -> Box<dyn Iterator<Item = (&'a str, &'a Value)> + 'a> {
        let lower = match after {
            Some(id) => Bound::Excluded(id.to_string()),
            None => Bound::Unbounded,
        };
        Box::new(
            self.rows
                .range::<String, _>((lower, Bound::Unbounded))
                .map(|(id, row)| (id.as_str(), &row.document)),
        )
    }

    fn fetch(&self, id: &str) -> Option<&Value> {
        self.rows.get(id).map(|row| &row.document)
    }
}

/// What an attempt id was spent on
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub kind: MutationKind,
    pub outcome: WriteOutcome,
}

impl AttemptRecord {
    /// True when a retry of `kind` on `id` is the same mutation.
    /// `None` matches any id (creates that auto-generate one).
    pub fn matches(&self, kind: MutationKind, id: Option<&str>) -> bool {
        self.kind == kind && id.map_or(true, |id| id == self.outcome.id)
    }
}

/// Applied attempt ids, oldest evicted first
#[derive(Debug, Clone)]
pub struct AttemptLog {
    capacity: usize,
    order: VecDeque<String>,
    records: HashMap<String, AttemptRecord>,
}

impl AttemptLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
            records: HashMap::new(),
        }
    }

    pub fn get(&self, attempt_id: &str) -> Option<&AttemptRecord> {
        self.records.get(attempt_id)
    }

    pub fn record(&mut self, attempt_id: String, kind: MutationKind, outcome: WriteOutcome) {
        if self.capacity == 0 {
            return;
        }
        let record = AttemptRecord { kind, outcome };
        if self.records.insert(attempt_id.clone(), record).is_none() {
            self.order.push_back(attempt_id);
        }
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.records.remove(&evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Everything one collection owns
#[derive(Debug)]
pub struct Partition {
    pub collection: Collection,
    pub documents: DocumentTable,
    pub indexes: IndexManager,
    pub aggregations: AggregationEngine,
    pub attempts: AttemptLog,
    /// Field paths seen on any stored document; never shrinks
    pub observed_paths: BTreeSet<String>,
}

impl Partition {
    pub fn new(collection: Collection, attempt_log_capacity: usize) -> Self {
        Self {
            collection,
            documents: DocumentTable::default(),
            indexes: IndexManager::new(),
            aggregations: AggregationEngine::new(),
            attempts: AttemptLog::new(attempt_log_capacity),
            observed_paths: BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outcome(id: &str) -> WriteOutcome {
        WriteOutcome {
            id: id.to_string(),
            revision: 1,
            document: None,
            duplicate: false,
        }
    }

    #[test]
    fn test_attempt_log_evicts_oldest() {
        let mut log = AttemptLog::new(2);
        log.record("a".into(), MutationKind::Insert, outcome("1"));
        log.record("b".into(), MutationKind::Insert, outcome("2"));
        log.record("c".into(), MutationKind::Insert, outcome("3"));
        assert_eq!(log.len(), 2);
        assert!(log.get("a").is_none());
        assert_eq!(log.get("c").map(|r| r.outcome.id.as_str()), Some("3"));
    }

    #[test]
    fn test_attempt_record_matches_kind_and_id() {
        let mut log = AttemptLog::new(4);
        log.record("a".into(), MutationKind::Update, outcome("1"));
        let record = log.get("a").unwrap();
        assert!(record.matches(MutationKind::Update, Some("1")));
        assert!(!record.matches(MutationKind::Update, Some("2")));
        assert!(!record.matches(MutationKind::Delete, Some("1")));
        assert!(record.matches(MutationKind::Update, None));
    }

    #[test]
    fn test_attempt_log_zero_capacity_keeps_nothing() {
        let mut log = AttemptLog::new(0);
        log.record("a".into(), MutationKind::Insert, outcome("1"));
        assert!(log.is_empty());
    }

    #[test]
    fn test_document_table_scan_after() {
        let mut table = DocumentTable::default();
        for id in ["b", "a", "c"] {
            table.put(StoredDocument {
                id: id.to_string(),
                revision: 1,
                document: json!({"id": id}),
            });
        }
        let ids: Vec<&str> = table.scan_after(Some("a")).map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(table.fetch("c"), Some(&json!({"id": "c"})));
    }
}
