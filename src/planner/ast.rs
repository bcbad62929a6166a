//! Query AST structures
//!
//! Wire shape of a predicate is a tagged tree:
//! `{"eq":{"field","value"}} | {"range":{"field","lower","upper"}} | {"and":[...]}`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{PlannerError, PlannerResult};
use crate::schema::path;

/// Predicate expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Predicate {
    /// field = value
    Eq { field: String, value: Value },
    /// lower <= field <= upper; a null bound is open
    Range {
        field: String,
        #[serde(default)]
        lower: Option<Value>,
        #[serde(default)]
        upper: Option<Value>,
    },
    /// Conjunction; nested `And` flattens
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Predicate::Eq {
            field: field.into(),
            value,
        }
    }

    pub fn range(field: impl Into<String>, lower: Option<Value>, upper: Option<Value>) -> Self {
        Predicate::Range {
            field: field.into(),
            lower,
            upper,
        }
    }

    pub fn and(predicates: Vec<Predicate>) -> Self {
        Predicate::And(predicates)
    }

    /// Flattens the tree into equality leaves plus at most one range leaf.
    pub fn flatten(&self) -> PlannerResult<Conjunction> {
        let mut conjunction = Conjunction::default();
        self.collect(&mut conjunction)?;
        Ok(conjunction)
    }

    fn collect(&self, out: &mut Conjunction) -> PlannerResult<()> {
        match self {
            Predicate::Eq { field, value } => {
                path::validate_path(field).map_err(|e| PlannerError::query_invalid(e.message()))?;
                out.eq.push(EqLeaf {
                    field: field.clone(),
                    value: value.clone(),
                });
            }
            Predicate::Range { field, lower, upper } => {
                path::validate_path(field).map_err(|e| PlannerError::query_invalid(e.message()))?;
                if let Some(existing) = &out.range {
                    return Err(PlannerError::query_invalid(format!(
                        "at most one range is allowed (found '{}' and '{}')",
                        existing.field, field
                    )));
                }
                out.range = Some(RangeLeaf {
                    field: field.clone(),
                    lower: lower.clone().filter(|v| !v.is_null()),
                    upper: upper.clone().filter(|v| !v.is_null()),
                });
            }
            Predicate::And(children) => {
                for child in children {
                    child.collect(out)?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EqLeaf {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeLeaf {
    pub field: String,
    pub lower: Option<Value>,
    pub upper: Option<Value>,
}

/// A flattened predicate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conjunction {
    pub eq: Vec<EqLeaf>,
    pub range: Option<RangeLeaf>,
}

impl Conjunction {
    pub fn is_empty(&self) -> bool {
        self.eq.is_empty() && self.range.is_none()
    }
}

/// A query request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<Predicate>,
    /// Explicitly named index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    /// Continuation token from a previous page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl Query {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Default::default()
        }
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }
}
