//! Explain plan output
//!
//! Produces deterministic explain output, as JSON or text.

use std::fmt;

use serde::Serialize;

use super::errors::PlannerError;
use super::planner::{FilterKind, QueryPlan};

/// Explain plan output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainPlan {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_type: Option<String>,
    /// Condition fields bound by equality
    pub bound_fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_field: Option<String>,
    /// Leaves evaluated against fetched documents
    pub residual: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    pub fn from_plan(plan: &QueryPlan) -> Self {
        let residual = plan
            .residual
            .iter()
            .map(|filter| match &filter.kind {
                FilterKind::Eq { value, .. } => format!("{} eq {}", filter.field, value),
                FilterKind::Range(_) => format!("{} range", filter.field),
            })
            .collect();

        Self {
            accepted: true,
            collection: Some(plan.collection.clone()),
            selected_index: plan.index.clone(),
            scan_type: Some(plan.scan_type.as_str().to_string()),
            bound_fields: plan.bound_fields.clone(),
            range_field: plan.range_field.clone(),
            residual,
            rejection_reason: None,
            rejection_code: None,
        }
    }

    pub fn from_error(err: &PlannerError) -> Self {
        Self {
            accepted: false,
            collection: None,
            selected_index: None,
            scan_type: None,
            bound_fields: Vec::new(),
            range_field: None,
            residual: Vec::new(),
            rejection_reason: Some(err.message().to_string()),
            rejection_code: Some(err.code().code().to_string()),
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            if let Some(scan) = &self.scan_type {
                writeln!(f, "Scan Type: {}", scan)?;
            }
            if let Some(idx) = &self.selected_index {
                writeln!(f, "Index: {}", idx)?;
            }
            if !self.bound_fields.is_empty() {
                writeln!(f, "Equality: {}", self.bound_fields.join(", "))?;
            }
            if let Some(range) = &self.range_field {
                writeln!(f, "Range: {}", range)?;
            }
            if !self.residual.is_empty() {
                writeln!(f, "Residual:")?;
                for leaf in &self.residual {
                    writeln!(f, "  - {}", leaf)?;
                }
            }
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}
