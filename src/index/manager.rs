//! Index Manager
//!
//! Owns the indexes of one collection and keeps them in step with its
//! documents.
//!
//! # API
//!
//! - `create(collection, index, observed, documents)` - get-or-create, back-filled
//! - `stage(collection, id, old, new)` - compute entry changes for one mutation
//! - `apply(delta)` - swap staged changes in (infallible)
//! - `tree(name)` - ordered entries for scanning
//!
//! Staging is fallible and side-effect free; applying cannot fail. A failed
//! stage therefore leaves every index untouched.

use std::collections::BTreeSet;

use serde_json::Value;

use super::btree::{EntryKey, IndexTree};
use super::definition::Index;
use super::errors::IndexResult;
use super::key::IndexKey;
use crate::schema::{path, Collection};

#[derive(Debug, Clone)]
struct IndexSlot {
    index: Index,
    tree: IndexTree,
}

/// Entry changes for one mutation across all indexes
#[derive(Debug, Default)]
pub struct IndexDelta {
    changes: Vec<EntryChange>,
}

#[derive(Debug)]
struct EntryChange {
    slot: usize,
    remove: Option<EntryKey>,
    insert: Option<EntryKey>,
}

impl IndexDelta {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Indexes of one collection, in declaration order
#[derive(Debug, Clone, Default)]
pub struct IndexManager {
    slots: Vec<IndexSlot>,
}

impl IndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index, or returns the existing one with the same name.
    ///
    /// The boolean is true when the index was newly created. A new index is
    /// back-filled from `documents`; if any document cannot be keyed the
    /// index is not registered.
    pub fn create<'d>(
        &mut self,
        collection: &Collection,
        index: Index,
        observed: &BTreeSet<String>,
        documents: impl IntoIterator<Item = (&'d str, &'d Value)>,
    ) -> IndexResult<(Index, bool)> {
        if let Some(existing) = self.get(&index.name) {
            return Ok((existing.clone(), false));
        }
        index.validate(collection, observed)?;

        let mut tree = IndexTree::new();
        for (id, document) in documents {
            if let Some(entry) = extract_entry(&index, collection, id, document)? {
                tree.insert(entry);
            }
        }
        self.slots.push(IndexSlot {
            index: index.clone(),
            tree,
        });
        Ok((index, true))
    }

    pub fn get(&self, name: &str) -> Option<&Index> {
        self.slots.iter().find(|s| s.index.name == name).map(|s| &s.index)
    }

    /// Definition and ordered entries of an index
    pub fn tree(&self, name: &str) -> Option<(&Index, &IndexTree)> {
        self.slots
            .iter()
            .find(|s| s.index.name == name)
            .map(|s| (&s.index, &s.tree))
    }

    /// Indexes in declaration order
    pub fn indexes(&self) -> impl Iterator<Item = &Index> {
        self.slots.iter().map(|s| &s.index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn remove(&mut self, name: &str) -> Option<Index> {
        let pos = self.slots.iter().position(|s| s.index.name == name)?;
        Some(self.slots.remove(pos).index)
    }

    /// Computes the entry changes for one document mutation.
    ///
    /// `old` is the stored document (None on insert), `new` the replacement
    /// (None on delete).
    pub fn stage(
        &self,
        collection: &Collection,
        id: &str,
        old: Option<&Value>,
        new: Option<&Value>,
    ) -> IndexResult<IndexDelta> {
        let mut delta = IndexDelta::default();
        for (slot, s) in self.slots.iter().enumerate() {
            let remove = match old {
                Some(doc) => extract_entry(&s.index, collection, id, doc)?,
                None => None,
            };
            let insert = match new {
                Some(doc) => extract_entry(&s.index, collection, id, doc)?,
                None => None,
            };
            if remove != insert {
                delta.changes.push(EntryChange { slot, remove, insert });
            }
        }
        Ok(delta)
    }

    /// Applies staged changes.
    pub fn apply(&mut self, delta: IndexDelta) {
        for change in delta.changes {
            if let Some(slot) = self.slots.get_mut(change.slot) {
                if let Some(entry) = &change.remove {
                    slot.tree.remove(entry);
                }
                if let Some(entry) = change.insert {
                    slot.tree.insert(entry);
                }
            }
        }
    }
}

/// Builds the entry for a document, or `None` when a condition field is
/// missing or null (sparse index).
fn extract_entry(
    index: &Index,
    collection: &Collection,
    id: &str,
    document: &Value,
) -> IndexResult<Option<EntryKey>> {
    let mut conditions = Vec::with_capacity(index.conditions.len());
    for condition in &index.conditions {
        match field_key(index, collection, condition, document)? {
            Some(key) => conditions.push(key),
            None => return Ok(None),
        }
    }
    let order = match &index.ordering_key {
        Some(field) => field_key(index, collection, field, document)?,
        None => None,
    };
    Ok(Some(EntryKey {
        conditions,
        order,
        id: id.to_string(),
    }))
}

fn field_key(
    index: &Index,
    collection: &Collection,
    field: &str,
    document: &Value,
) -> IndexResult<Option<IndexKey>> {
    match path::lookup(document, field) {
        Some(value) => IndexKey::from_value(field, value, collection.declared_type(field))
            .map_err(|e| e.in_index(&index.name)),
        None => Ok(None),
    }
}
