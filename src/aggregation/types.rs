//! Aggregation configurations and values

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::errors::{AggregationError, AggregationResult};
use crate::schema::{path, Collection, FieldType, PathResolution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregationType {
    CollectionCount,
    Sum,
    Avg,
}

impl AggregationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationType::CollectionCount => "COLLECTION_COUNT",
            AggregationType::Sum => "SUM",
            AggregationType::Avg => "AVG",
        }
    }

    /// Segment used in derived configuration names
    fn name_segment(&self) -> &'static str {
        match self {
            AggregationType::CollectionCount => "collection_count",
            AggregationType::Sum => "sum",
            AggregationType::Avg => "avg",
        }
    }
}

/// Kind of document mutation; also the trigger vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Insert => "INSERT",
            MutationKind::Update => "UPDATE",
            MutationKind::Delete => "DELETE",
        }
    }
}

fn all_triggers() -> BTreeSet<MutationKind> {
    [MutationKind::Insert, MutationKind::Update, MutationKind::Delete]
        .into_iter()
        .collect()
}

/// Current value of an aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum AggregationValue {
    Count { count: u64 },
    Sum { value: f64 },
    /// `value = sum / count`, 0 when nothing contributed
    Avg { value: f64, count: u64 },
}

/// Running state behind every aggregation type
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningTotal {
    /// Contributing documents
    pub count: u64,
    pub sum: f64,
}

impl RunningTotal {
    pub fn value(&self, aggregation_type: AggregationType) -> AggregationValue {
        match aggregation_type {
            AggregationType::CollectionCount => AggregationValue::Count { count: self.count },
            AggregationType::Sum => AggregationValue::Sum { value: self.sum },
            AggregationType::Avg => AggregationValue::Avg {
                value: if self.count == 0 {
                    0.0
                } else {
                    self.sum / self.count as f64
                },
                count: self.count,
            },
        }
    }

    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Removes one contribution.
    ///
    /// The count never goes below zero. A SUM always subtracts the value,
    /// even when it never saw the matching addition; an AVG with no
    /// contributions left resets to zero.
    pub fn subtract(&mut self, value: f64, aggregation_type: AggregationType) {
        match aggregation_type {
            AggregationType::Sum => {
                self.sum -= value;
                self.count = self.count.saturating_sub(1);
            }
            AggregationType::CollectionCount | AggregationType::Avg => {
                if self.count > 0 {
                    self.sum -= value;
                    self.count -= 1;
                }
                if self.count == 0 {
                    self.sum = 0.0;
                }
            }
        }
    }
}

/// A configured aggregation, with its current value when read back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationConfiguration {
    /// Derived as `<collection>__<type>[__<target_field>]`
    #[serde(default)]
    pub name: String,
    pub collection: String,
    #[serde(rename = "type")]
    pub aggregation_type: AggregationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_field: Option<String>,
    #[serde(default = "all_triggers")]
    pub triggers: BTreeSet<MutationKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<AggregationValue>,
}

/// Derives the configuration name
pub fn aggregation_name(collection: &str, aggregation_type: AggregationType, target_field: Option<&str>) -> String {
    let mut name = format!("{}__{}", collection, aggregation_type.name_segment());
    if let Some(field) = target_field {
        name.push_str("__");
        name.push_str(field);
    }
    name
}

impl AggregationConfiguration {
    /// Create a configuration triggered by every mutation kind
    pub fn new(collection: impl Into<String>, aggregation_type: AggregationType, target_field: Option<String>) -> Self {
        let collection = collection.into();
        Self {
            name: aggregation_name(&collection, aggregation_type, target_field.as_deref()),
            collection,
            aggregation_type,
            target_field,
            triggers: all_triggers(),
            aggregation: None,
        }
    }

    pub fn count(collection: impl Into<String>) -> Self {
        Self::new(collection, AggregationType::CollectionCount, None)
    }

    pub fn sum(collection: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(collection, AggregationType::Sum, Some(field.into()))
    }

    pub fn avg(collection: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(collection, AggregationType::Avg, Some(field.into()))
    }

    pub fn with_triggers(mut self, triggers: impl IntoIterator<Item = MutationKind>) -> Self {
        self.triggers = triggers.into_iter().collect();
        self
    }

    pub fn is_triggered_by(&self, kind: MutationKind) -> bool {
        self.triggers.contains(&kind)
    }

    /// Checks the shape and recomputes the derived name.
    pub fn normalize(mut self) -> AggregationResult<Self> {
        match (self.aggregation_type, &self.target_field) {
            (AggregationType::CollectionCount, Some(_)) => {
                return Err(AggregationError::invalid("COLLECTION_COUNT takes no target field"))
            }
            (AggregationType::Sum | AggregationType::Avg, None) => {
                return Err(AggregationError::invalid(format!(
                    "{} requires a target field",
                    self.aggregation_type.as_str()
                )))
            }
            (_, Some(field)) if !path::is_valid_path(field) => {
                return Err(AggregationError::invalid(format!(
                    "'{}' is not a valid field path",
                    field
                )))
            }
            _ => {}
        }
        if self.triggers.is_empty() {
            return Err(AggregationError::invalid("triggers must not be empty"));
        }
        self.name = aggregation_name(
            &self.collection,
            self.aggregation_type,
            self.target_field.as_deref(),
        );
        self.aggregation = None;
        Ok(self)
    }

    /// Resolves the target field against the collection.
    ///
    /// The target must be a declared NUMBER field, fall under an open
    /// collection or object, or have been observed on a stored document.
    pub fn validate_target(&self, collection: &Collection, observed: &BTreeSet<String>) -> AggregationResult<()> {
        let Some(field) = self.target_field.as_deref() else {
            return Ok(());
        };
        match collection.resolve_path(field) {
            PathResolution::Declared(def) if def.field_type != FieldType::Number => {
                Err(AggregationError::invalid(format!(
                    "{} target '{}' is declared {}, expected NUMBER",
                    self.aggregation_type.as_str(),
                    field,
                    def.field_type.type_name()
                )))
            }
            PathResolution::Declared(_) | PathResolution::Open => Ok(()),
            PathResolution::Unresolved if observed.contains(field) => Ok(()),
            PathResolution::Unresolved => Err(AggregationError::invalid(format!(
                "target '{}' does not resolve on collection '{}'",
                field, collection.name
            ))),
        }
    }
}
