//! Ordered index structure
//!
//! Each index is a `BTreeSet<EntryKey>`: entries sort by the condition-value
//! tuple, then by ordering value, then by document identity. Iteration order
//! is therefore deterministic and stable for pagination.

use std::collections::BTreeSet;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use super::key::IndexKey;

/// A single index entry; also the resume position of an index scan.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    pub conditions: Vec<IndexKey>,
    /// Ordering value; `None` sorts before any value
    pub order: Option<IndexKey>,
    pub id: String,
}

/// Inclusive `[lower, upper]` range, either side open when `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRange {
    pub lower: Option<IndexKey>,
    pub upper: Option<IndexKey>,
}

impl KeyRange {
    pub fn contains(&self, key: &IndexKey) -> bool {
        self.lower.as_ref().map_or(true, |l| key >= l) && self.upper.as_ref().map_or(true, |u| key <= u)
    }

    fn below_upper(&self, key: &IndexKey) -> bool {
        self.upper.as_ref().map_or(true, |u| key <= u)
    }
}

/// Bounds of one index scan.
///
/// `prefix` binds the leading conditions by equality. `condition_range`
/// bounds the condition right after the prefix. `order_range` bounds the
/// ordering value and only applies when every condition is bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanBounds {
    pub prefix: Vec<IndexKey>,
    pub condition_range: Option<KeyRange>,
    pub order_range: Option<KeyRange>,
}

impl ScanBounds {
    fn start(&self) -> EntryKey {
        let mut conditions = self.prefix.clone();
        let mut order = None;
        if let Some(lower) = self.condition_range.as_ref().and_then(|r| r.lower.clone()) {
            conditions.push(lower);
        } else if let Some(lower) = self.order_range.as_ref().and_then(|r| r.lower.clone()) {
            order = Some(lower);
        }
        EntryKey {
            conditions,
            order,
            id: String::new(),
        }
    }

    /// True while an entry can still be in range; scanning stops at the first false.
    fn within(&self, entry: &EntryKey) -> bool {
        let p = self.prefix.len();
        if entry.conditions.len() < p || entry.conditions[..p] != self.prefix[..] {
            return false;
        }
        if let Some(range) = &self.condition_range {
            match entry.conditions.get(p) {
                Some(key) if range.below_upper(key) => {}
                _ => return false,
            }
        }
        if let (Some(range), Some(order)) = (&self.order_range, &entry.order) {
            if !range.below_upper(order) {
                return false;
            }
        }
        true
    }

    fn matches(&self, entry: &EntryKey) -> bool {
        match &self.order_range {
            Some(range) => entry.order.as_ref().map_or(false, |o| range.contains(o)),
            None => true,
        }
    }
}

/// Ordered entries of one index
#[derive(Debug, Clone, Default)]
pub struct IndexTree {
    entries: BTreeSet<EntryKey>,
}

impl IndexTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: EntryKey) {
        self.entries.insert(entry);
    }

    pub fn remove(&mut self, entry: &EntryKey) {
        self.entries.remove(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries inside `bounds` in index order, resuming strictly
    /// after `after` when given.
    pub fn scan<'a>(
        &'a self,
        bounds: &'a ScanBounds,
        after: Option<&EntryKey>,
    ) -> impl Iterator<Item = &'a EntryKey> + 'a {
        let start = bounds.start();
        let lower = match after {
            Some(position) if *position >= start => Bound::Excluded(position.clone()),
            _ => Bound::Included(start),
        };
        self.entries
            .range((lower, Bound::Unbounded))
            .take_while(move |entry| bounds.within(entry))
            .filter(move |entry| bounds.matches(entry))
    }
}
