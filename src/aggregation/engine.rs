//! Aggregation engine
//!
//! Maintains the running totals of one collection's aggregations. Like the
//! index manager, every mutation is first staged (fallible, no side effects)
//! and then applied (infallible), so the store can fold aggregation updates
//! into the same all-or-nothing unit as the document and index writes.

use std::collections::BTreeSet;

use serde_json::Value;

use super::errors::{AggregationError, AggregationResult};
use super::types::{AggregationConfiguration, AggregationType, MutationKind, RunningTotal};
use crate::schema::{json_type_name, path, Collection};

#[derive(Debug, Clone)]
struct AggregationSlot {
    config: AggregationConfiguration,
    total: RunningTotal,
}

/// New totals for the aggregations one mutation touches
#[derive(Debug, Default)]
pub struct AggregationDelta {
    updates: Vec<(usize, RunningTotal)>,
}

impl AggregationDelta {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AggregationEngine {
    slots: Vec<AggregationSlot>,
}

impl AggregationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a configuration, or returns the existing one of the same
    /// name. New configurations are back-filled as if every document in
    /// `documents` had just been inserted.
    pub fn create<'d>(
        &mut self,
        collection: &Collection,
        config: AggregationConfiguration,
        observed: &BTreeSet<String>,
        documents: impl IntoIterator<Item = &'d Value>,
    ) -> AggregationResult<(AggregationConfiguration, bool)> {
        let config = config.normalize()?;
        if let Some(existing) = self.get(&config.name) {
            return Ok((existing, false));
        }
        config.validate_target(collection, observed)?;

        let mut total = RunningTotal::default();
        for document in documents {
            contribute(&config, &mut total, MutationKind::Insert, None, Some(document))?;
        }
        let slot = AggregationSlot { config, total };
        let materialized = slot.materialize();
        self.slots.push(slot);
        Ok((materialized, true))
    }

    /// Configuration with its current value
    pub fn get(&self, name: &str) -> Option<AggregationConfiguration> {
        self.slots
            .iter()
            .find(|s| s.config.name == name)
            .map(AggregationSlot::materialize)
    }

    pub fn list(&self) -> Vec<AggregationConfiguration> {
        self.slots.iter().map(AggregationSlot::materialize).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn remove(&mut self, name: &str) -> AggregationResult<AggregationConfiguration> {
        let pos = self
            .slots
            .iter()
            .position(|s| s.config.name == name)
            .ok_or_else(|| AggregationError::unknown(name))?;
        Ok(self.slots.remove(pos).config)
    }

    /// Computes the new totals for one mutation.
    ///
    /// Only configurations whose triggers include `kind` are touched.
    pub fn stage(
        &self,
        kind: MutationKind,
        old: Option<&Value>,
        new: Option<&Value>,
    ) -> AggregationResult<AggregationDelta> {
        let mut delta = AggregationDelta::default();
        for (index, slot) in self.slots.iter().enumerate() {
            if !slot.config.is_triggered_by(kind) {
                continue;
            }
            let mut total = slot.total;
            contribute(&slot.config, &mut total, kind, old, new)?;
            if total != slot.total {
                delta.updates.push((index, total));
            }
        }
        Ok(delta)
    }

    pub fn apply(&mut self, delta: AggregationDelta) {
        for (index, total) in delta.updates {
            if let Some(slot) = self.slots.get_mut(index) {
                slot.total = total;
            }
        }
    }
}

impl AggregationSlot {
    fn materialize(&self) -> AggregationConfiguration {
        let mut config = self.config.clone();
        config.aggregation = Some(self.total.value(config.aggregation_type));
        config
    }
}

fn contribute(
    config: &AggregationConfiguration,
    total: &mut RunningTotal,
    kind: MutationKind,
    old: Option<&Value>,
    new: Option<&Value>,
) -> AggregationResult<()> {
    match config.aggregation_type {
        AggregationType::CollectionCount => match kind {
            MutationKind::Insert => total.add(0.0),
            MutationKind::Delete => total.subtract(0.0, AggregationType::CollectionCount),
            MutationKind::Update => {}
        },
        AggregationType::Sum | AggregationType::Avg => {
            let previous = match (kind, old) {
                (MutationKind::Update | MutationKind::Delete, Some(doc)) => target_value(config, doc)?,
                _ => None,
            };
            let next = match (kind, new) {
                (MutationKind::Insert | MutationKind::Update, Some(doc)) => target_value(config, doc)?,
                _ => None,
            };
            if let Some(value) = previous {
                total.subtract(value, config.aggregation_type);
            }
            if let Some(value) = next {
                total.add(value);
            }
        }
    }
    Ok(())
}

/// Numeric value of the target field; missing or null contributes nothing
fn target_value(config: &AggregationConfiguration, document: &Value) -> AggregationResult<Option<f64>> {
    let Some(field) = config.target_field.as_deref() else {
        return Ok(None);
    };
    match path::lookup(document, field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) => Ok(Some(v)),
            None => Err(AggregationError::non_numeric(&config.name, field, "number")),
        },
        Some(other) => Err(AggregationError::non_numeric(
            &config.name,
            field,
            json_type_name(other),
        )),
    }
}
