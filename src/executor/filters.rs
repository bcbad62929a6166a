//! Residual predicate filtering
//!
//! Leaves the index scan could not consume are evaluated against each
//! fetched document. Comparison is typed the same way index keys are; a
//! missing or null field never matches.

use serde_json::Value;

use crate::index::IndexKey;
use crate::planner::{FieldFilter, FilterKind};
use crate::schema::{path, Collection};

/// Evaluates residual filters against documents
pub struct PredicateFilter<'a> {
    collection: &'a Collection,
    filters: &'a [FieldFilter],
}

impl<'a> PredicateFilter<'a> {
    pub fn new(collection: &'a Collection, filters: &'a [FieldFilter]) -> Self {
        Self { collection, filters }
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Checks if a document matches every filter (AND semantics)
    pub fn matches(&self, document: &Value) -> bool {
        self.filters.iter().all(|f| self.matches_filter(document, f))
    }

    fn matches_filter(&self, document: &Value, filter: &FieldFilter) -> bool {
        let actual = match path::lookup(document, &filter.field) {
            Some(v) if !v.is_null() => v,
            _ => return false,
        };
        match &filter.kind {
            FilterKind::Eq { value, key: Some(expected) } => {
                self.key_of(&filter.field, actual).map_or(false, |k| &k == expected)
                    || actual == value
            }
            FilterKind::Eq { value, key: None } => actual == value,
            FilterKind::Range(range) => self
                .key_of(&filter.field, actual)
                .map_or(false, |k| range.contains(&k)),
        }
    }

    fn key_of(&self, field: &str, value: &Value) -> Option<IndexKey> {
        IndexKey::from_value(field, value, self.collection.declared_type(field))
            .ok()
            .flatten()
    }
}
