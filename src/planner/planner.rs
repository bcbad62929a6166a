//! Query planner
//!
//! Produces deterministic, immutable query plans.
//!
//! Explicit index: equality leaves must bind a prefix of the index
//! conditions and a range leaf must target the last condition or the
//! ordering key. The range bounds the scan only when it directly follows the
//! bound prefix; otherwise it runs as a residual filter over the prefix scan.
//!
//! Automatic selection considers only fully constrained indexes. The index
//! consuming the most predicate leaves wins; ties go to the index declared
//! first. Without a candidate the plan is a full scan in identity order.

use serde_json::Value;

use super::ast::{Conjunction, EqLeaf, Query, RangeLeaf};
use super::errors::{PlannerError, PlannerResult};
use crate::index::{Index, IndexKey, IndexManager, KeyRange, ScanBounds};
use crate::schema::Collection;

/// Read-only view of a collection's indexes, in declaration order.
pub trait IndexCatalog {
    fn declared_indexes(&self) -> Vec<&Index>;

    fn find_index(&self, name: &str) -> Option<&Index> {
        self.declared_indexes().into_iter().find(|i| i.name == name)
    }
}

impl IndexCatalog for IndexManager {
    fn declared_indexes(&self) -> Vec<&Index> {
        self.indexes().collect()
    }

    fn find_index(&self, name: &str) -> Option<&Index> {
        self.get(name)
    }
}

/// Scan type used by query plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    /// Whole collection in identity order
    FullScan,
    /// Index scan bounded by equality only
    IndexEquality,
    /// Index scan with a trailing range
    IndexRange,
}

impl ScanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::FullScan => "FULL_SCAN",
            ScanType::IndexEquality => "INDEX_EQ",
            ScanType::IndexRange => "INDEX_RANGE",
        }
    }
}

/// Residual test on one field
#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    /// Typed key when the value is keyable, else raw JSON equality
    Eq { value: Value, key: Option<IndexKey> },
    Range(KeyRange),
}

/// A predicate leaf not consumed by the index scan
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub kind: FilterKind,
}

/// Immutable query plan (no runtime state)
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub collection: String,
    pub scan_type: ScanType,
    /// Chosen index name, `None` for a full scan
    pub index: Option<String>,
    /// Condition fields bound by equality, in index order
    pub bound_fields: Vec<String>,
    /// Field bounded by the scan range
    pub range_field: Option<String>,
    pub bounds: ScanBounds,
    pub residual: Vec<FieldFilter>,
}

impl QueryPlan {
    /// Identifies the scan a cursor belongs to.
    pub fn scan_id(&self) -> String {
        match &self.index {
            Some(index) => format!("{}/{}", self.collection, index),
            None => format!("{}/*", self.collection),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeTarget {
    Condition,
    Order,
}

/// How a conjunction binds to one index
#[derive(Debug)]
struct Binding {
    /// Positions of consumed equality leaves
    eq_used: Vec<usize>,
    prefix: Vec<IndexKey>,
    range: Option<(RangeTarget, KeyRange)>,
    fully_constrained: bool,
}

impl Binding {
    fn consumed(&self) -> usize {
        self.eq_used.len() + usize::from(self.range.is_some())
    }
}

/// Query planner that produces deterministic plans
pub struct QueryPlanner<'a, C: IndexCatalog> {
    collection: &'a Collection,
    catalog: &'a C,
}

impl<'a, C: IndexCatalog> QueryPlanner<'a, C> {
    pub fn new(collection: &'a Collection, catalog: &'a C) -> Self {
        Self { collection, catalog }
    }

    /// Plans a query, returning an immutable plan or error.
    ///
    /// Same inputs always produce the same plan.
    pub fn plan(&self, query: &Query) -> PlannerResult<QueryPlan> {
        let conjunction = match &query.predicate {
            Some(predicate) => predicate.flatten()?,
            None => Conjunction::default(),
        };

        match &query.index {
            Some(name) => {
                let index = self
                    .catalog
                    .find_index(name)
                    .ok_or_else(|| PlannerError::unknown_index(name))?;
                let binding = self.bind(index, &conjunction)?;
                self.check_explicit(index, &conjunction, &binding)?;
                self.build(Some((index, binding)), &conjunction)
            }
            None => {
                let mut best: Option<(&Index, Binding)> = None;
                for index in self.catalog.declared_indexes() {
                    let binding = self.bind(index, &conjunction)?;
                    if !binding.fully_constrained {
                        continue;
                    }
                    let better = best
                        .as_ref()
                        .map_or(true, |(_, b)| binding.consumed() > b.consumed());
                    if better {
                        best = Some((index, binding));
                    }
                }
                self.build(best, &conjunction)
            }
        }
    }

    /// Binds equality leaves to the leading conditions and the range leaf to
    /// the last condition or the ordering key.
    fn bind(&self, index: &Index, conjunction: &Conjunction) -> PlannerResult<Binding> {
        let mut eq_used = Vec::new();
        let mut prefix = Vec::new();
        for condition in &index.conditions {
            let found = conjunction
                .eq
                .iter()
                .enumerate()
                .find(|(_, leaf)| &leaf.field == condition);
            let Some((pos, leaf)) = found else { break };
            match self.key(&leaf.field, &leaf.value)? {
                Some(key) => {
                    eq_used.push(pos);
                    prefix.push(key);
                }
                None => break,
            }
        }

        let bound = prefix.len();
        let total = index.conditions.len();
        let mut range = None;
        if let Some(leaf) = &conjunction.range {
            let on_last = bound + 1 == total && index.conditions[bound] == leaf.field;
            let on_order = bound == total && index.ordering_key.as_deref() == Some(leaf.field.as_str());
            if on_last {
                range = Some((RangeTarget::Condition, self.key_range(leaf)?));
            } else if on_order {
                range = Some((RangeTarget::Order, self.key_range(leaf)?));
            }
        }
        let fully_constrained =
            bound == total || matches!(range, Some((RangeTarget::Condition, _)));

        Ok(Binding {
            eq_used,
            prefix,
            range,
            fully_constrained,
        })
    }

    /// Every leaf must be consumed by the named index or repeat a bound field.
    fn check_explicit(&self, index: &Index, conjunction: &Conjunction, binding: &Binding) -> PlannerResult<()> {
        let bound = &index.conditions[..binding.prefix.len()];
        for (pos, leaf) in conjunction.eq.iter().enumerate() {
            if binding.eq_used.contains(&pos) || bound.contains(&leaf.field) {
                continue;
            }
            let reason = if index.conditions.contains(&leaf.field) {
                "equality fields must form a prefix of the index conditions"
            } else {
                "field is not an index condition"
            };
            return Err(PlannerError::index_mismatch(&index.name, &leaf.field, reason));
        }
        if let (Some(leaf), None) = (&conjunction.range, &binding.range) {
            let on_last = index.conditions.last() == Some(&leaf.field);
            let on_order = index.ordering_key.as_deref() == Some(leaf.field.as_str());
            if !on_last && !on_order {
                return Err(PlannerError::index_mismatch(
                    &index.name,
                    &leaf.field,
                    "range must target the last condition or the ordering key",
                ));
            }
        }
        Ok(())
    }

    fn build(&self, chosen: Option<(&Index, Binding)>, conjunction: &Conjunction) -> PlannerResult<QueryPlan> {
        let Some((index, binding)) = chosen else {
            let residual = self.residual(conjunction, &[], true)?;
            return Ok(QueryPlan {
                collection: self.collection.name.clone(),
                scan_type: ScanType::FullScan,
                index: None,
                bound_fields: Vec::new(),
                range_field: None,
                bounds: ScanBounds::default(),
                residual,
            });
        };

        let range_consumed = binding.range.is_some();
        let residual = self.residual(conjunction, &binding.eq_used, !range_consumed)?;
        let bound_fields = index.conditions[..binding.prefix.len()].to_vec();
        let range_field = if range_consumed {
            conjunction.range.as_ref().map(|r| r.field.clone())
        } else {
            None
        };
        let mut bounds = ScanBounds {
            prefix: binding.prefix,
            ..Default::default()
        };
        match binding.range {
            Some((RangeTarget::Condition, range)) => bounds.condition_range = Some(range),
            Some((RangeTarget::Order, range)) => bounds.order_range = Some(range),
            None => {}
        }
        Ok(QueryPlan {
            collection: self.collection.name.clone(),
            scan_type: if range_consumed {
                ScanType::IndexRange
            } else {
                ScanType::IndexEquality
            },
            index: Some(index.name.clone()),
            bound_fields,
            range_field,
            bounds,
            residual,
        })
    }

    fn residual(&self, conjunction: &Conjunction, eq_used: &[usize], include_range: bool) -> PlannerResult<Vec<FieldFilter>> {
        let mut filters = Vec::new();
        for (pos, leaf) in conjunction.eq.iter().enumerate() {
            if eq_used.contains(&pos) {
                continue;
            }
            filters.push(self.eq_filter(leaf)?);
        }
        if include_range {
            if let Some(leaf) = &conjunction.range {
                filters.push(FieldFilter {
                    field: leaf.field.clone(),
                    kind: FilterKind::Range(self.key_range(leaf)?),
                });
            }
        }
        Ok(filters)
    }

    fn eq_filter(&self, leaf: &EqLeaf) -> PlannerResult<FieldFilter> {
        Ok(FieldFilter {
            field: leaf.field.clone(),
            kind: FilterKind::Eq {
                value: leaf.value.clone(),
                key: self.key(&leaf.field, &leaf.value)?,
            },
        })
    }

    fn key_range(&self, leaf: &RangeLeaf) -> PlannerResult<KeyRange> {
        let bound = |value: &Option<Value>| -> PlannerResult<Option<IndexKey>> {
            match value {
                Some(v) => self.key(&leaf.field, v),
                None => Ok(None),
            }
        };
        Ok(KeyRange {
            lower: bound(&leaf.lower)?,
            upper: bound(&leaf.upper)?,
        })
    }

    fn key(&self, field: &str, value: &Value) -> PlannerResult<Option<IndexKey>> {
        IndexKey::from_value(field, value, self.collection.declared_type(field))
            .map_err(|e| PlannerError::query_invalid(e.message()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexConfiguration;
    use crate::planner::{Predicate, PlannerErrorCode};
    use crate::schema::FieldDef;
    use serde_json::json;

    struct Indexes(Vec<Index>);

    impl IndexCatalog for Indexes {
        fn declared_indexes(&self) -> Vec<&Index> {
            self.0.iter().collect()
        }
    }

    fn index(conditions: &[&str], ordering_key: Option<&str>) -> Index {
        Index::new(
            "book",
            conditions.iter().map(|c| c.to_string()).collect(),
            ordering_key.map(String::from),
            IndexConfiguration::OptimizeRead,
        )
    }

    fn book() -> Collection {
        Collection::new("book", "isbn")
    }

    fn catalog() -> Indexes {
        Indexes(vec![
            index(&["author"], None),
            index(&["title"], None),
            index(&["category.name"], None),
            index(&["category.name", "rating"], Some("rating")),
        ])
    }

    #[test]
    fn test_no_predicate_is_full_scan() {
        let c = book();
        let cat = catalog();
        let plan = QueryPlanner::new(&c, &cat).plan(&Query::new("book")).unwrap();
        assert_eq!(plan.scan_type, ScanType::FullScan);
        assert_eq!(plan.index, None);
        assert!(plan.residual.is_empty());
        assert_eq!(plan.scan_id(), "book/*");
    }

    #[test]
    fn test_auto_equality() {
        let c = book();
        let cat = catalog();
        let query = Query::new("book").with_predicate(Predicate::eq("author", json!("Chuck Palhaniuk")));
        let plan = QueryPlanner::new(&c, &cat).plan(&query).unwrap();
        assert_eq!(plan.scan_type, ScanType::IndexEquality);
        assert_eq!(plan.index.as_deref(), Some("book__author"));
        assert_eq!(plan.bounds.prefix, vec![IndexKey::from_string("Chuck Palhaniuk")]);
    }

    #[test]
    fn test_auto_prefers_most_constrained() {
        let c = book();
        let cat = catalog();
        let query = Query::new("book").with_predicate(Predicate::and(vec![
            Predicate::eq("category.name", json!("Pulp")),
            Predicate::range("rating", Some(json!("07")), Some(json!("09"))),
        ]));
        let plan = QueryPlanner::new(&c, &cat).plan(&query).unwrap();
        assert_eq!(plan.scan_type, ScanType::IndexRange);
        assert_eq!(plan.index.as_deref(), Some("book__category.name__rating"));
        assert_eq!(plan.range_field.as_deref(), Some("rating"));
        assert!(plan.residual.is_empty());
    }

    #[test]
    fn test_auto_tie_goes_to_declaration_order() {
        let c = book();
        let cat = catalog();
        let query = Query::new("book").with_predicate(Predicate::and(vec![
            Predicate::eq("title", json!("Choke")),
            Predicate::eq("author", json!("Chuck Palhaniuk")),
        ]));
        let plan = QueryPlanner::new(&c, &cat).plan(&query).unwrap();
        assert_eq!(plan.index.as_deref(), Some("book__author"));
        assert_eq!(plan.residual.len(), 1);
        assert_eq!(plan.residual[0].field, "title");
    }

    #[test]
    fn test_auto_partial_prefix_not_candidate() {
        let c = book();
        let cat = Indexes(vec![index(&["category.name", "rating"], None)]);
        let query = Query::new("book").with_predicate(Predicate::eq("category.name", json!("Pulp")));
        let plan = QueryPlanner::new(&c, &cat).plan(&query).unwrap();
        assert_eq!(plan.scan_type, ScanType::FullScan);
        assert_eq!(plan.residual.len(), 1);
    }

    #[test]
    fn test_auto_range_on_ordering_key() {
        let c = book();
        let cat = Indexes(vec![index(&["category.name"], Some("rating"))]);
        let query = Query::new("book").with_predicate(Predicate::and(vec![
            Predicate::eq("category.name", json!("Pulp")),
            Predicate::range("rating", Some(json!("07")), None),
        ]));
        let plan = QueryPlanner::new(&c, &cat).plan(&query).unwrap();
        assert_eq!(plan.scan_type, ScanType::IndexRange);
        assert!(plan.bounds.order_range.is_some());
        assert!(plan.bounds.condition_range.is_none());
    }

    #[test]
    fn test_explicit_prefix_allowed() {
        let c = book();
        let cat = catalog();
        let query = Query::new("book")
            .with_index("book__category.name__rating")
            .with_predicate(Predicate::eq("category.name", json!("Pulp")));
        let plan = QueryPlanner::new(&c, &cat).plan(&query).unwrap();
        assert_eq!(plan.scan_type, ScanType::IndexEquality);
        assert_eq!(plan.bound_fields, vec!["category.name"]);
    }

    #[test]
    fn test_explicit_without_predicate_scans_index() {
        let c = book();
        let cat = catalog();
        let plan = QueryPlanner::new(&c, &cat)
            .plan(&Query::new("book").with_index("book__title"))
            .unwrap();
        assert_eq!(plan.index.as_deref(), Some("book__title"));
        assert!(plan.bounds.prefix.is_empty());
        assert_eq!(plan.scan_id(), "book/book__title");
    }

    #[test]
    fn test_explicit_mismatch() {
        let c = book();
        let cat = catalog();
        let planner = QueryPlanner::new(&c, &cat);

        let foreign = Query::new("book")
            .with_index("book__author")
            .with_predicate(Predicate::eq("title", json!("Choke")));
        assert_eq!(planner.plan(&foreign).unwrap_err().code(), PlannerErrorCode::PlusIndexMismatch);

        let gap = Query::new("book")
            .with_index("book__category.name__rating")
            .with_predicate(Predicate::eq("rating", json!("07")));
        assert_eq!(planner.plan(&gap).unwrap_err().code(), PlannerErrorCode::PlusIndexMismatch);

        let range_first = Query::new("book")
            .with_index("book__category.name__rating")
            .with_predicate(Predicate::range("category.name", None, None));
        assert_eq!(
            planner.plan(&range_first).unwrap_err().code(),
            PlannerErrorCode::PlusIndexMismatch
        );
    }

    #[test]
    fn test_explicit_range_without_full_prefix_is_residual() {
        let c = book();
        let cat = catalog();
        let planner = QueryPlanner::new(&c, &cat);

        let range_only = Query::new("book")
            .with_index("book__category.name__rating")
            .with_predicate(Predicate::range("rating", Some(json!("07")), Some(json!("09"))));
        let plan = planner.plan(&range_only).unwrap();
        assert_eq!(plan.index.as_deref(), Some("book__category.name__rating"));
        assert_eq!(plan.scan_type, ScanType::IndexEquality);
        assert!(plan.bounds.prefix.is_empty());
        assert!(plan.bounds.condition_range.is_none());
        assert_eq!(plan.range_field, None);
        assert_eq!(plan.residual.len(), 1);
        assert_eq!(plan.residual[0].field, "rating");
        assert!(matches!(plan.residual[0].kind, FilterKind::Range(_)));

        let wide = Indexes(vec![index(&["a", "b", "c"], None)]);
        let skip = Query::new("book").with_index("book__a__b__c").with_predicate(Predicate::and(vec![
            Predicate::eq("a", json!("x")),
            Predicate::range("c", Some(json!(1)), None),
        ]));
        let plan = QueryPlanner::new(&c, &wide).plan(&skip).unwrap();
        assert_eq!(plan.bound_fields, vec!["a"]);
        assert_eq!(plan.residual.len(), 1);
        assert_eq!(plan.residual[0].field, "c");

        let middle = Query::new("book")
            .with_index("book__a__b__c")
            .with_predicate(Predicate::range("b", None, Some(json!(3))));
        assert_eq!(
            QueryPlanner::new(&c, &wide).plan(&middle).unwrap_err().code(),
            PlannerErrorCode::PlusIndexMismatch
        );
    }

    #[test]
    fn test_explicit_ordering_key_range_before_full_prefix() {
        let c = book();
        let cat = Indexes(vec![index(&["category.name", "author"], Some("rating"))]);
        let query = Query::new("book")
            .with_index("book__category.name__author")
            .with_predicate(Predicate::and(vec![
                Predicate::eq("category.name", json!("Pulp")),
                Predicate::range("rating", Some(json!("05")), None),
            ]));
        let plan = QueryPlanner::new(&c, &cat).plan(&query).unwrap();
        assert_eq!(plan.bound_fields, vec!["category.name"]);
        assert!(plan.bounds.order_range.is_none());
        assert_eq!(plan.residual.len(), 1);
    }

    #[test]
    fn test_explicit_unknown_index() {
        let c = book();
        let cat = catalog();
        let query = Query::new("book").with_index("book__nope");
        assert_eq!(
            QueryPlanner::new(&c, &cat).plan(&query).unwrap_err().code(),
            PlannerErrorCode::PlusUnknownIndex
        );
    }

    #[test]
    fn test_declared_type_mismatch_is_invalid() {
        let c = Collection::new("review", "id").with_fields(vec![FieldDef::number("rate")]);
        let cat = Indexes(vec![]);
        let query = Query::new("review").with_predicate(Predicate::eq("rate", json!("high")));
        assert_eq!(
            QueryPlanner::new(&c, &cat).plan(&query).unwrap_err().code(),
            PlannerErrorCode::PlusQueryInvalid
        );
    }

    #[test]
    fn test_deterministic_planning() {
        let c = book();
        let cat = catalog();
        let planner = QueryPlanner::new(&c, &cat);
        let query = Query::new("book").with_predicate(Predicate::and(vec![
            Predicate::eq("category.name", json!("Pulp")),
            Predicate::eq("author", json!("x")),
        ]));
        let plans: Vec<_> = (0..3).map(|_| planner.plan(&query).unwrap()).collect();
        assert_eq!(plans[0], plans[1]);
        assert_eq!(plans[1], plans[2]);
    }
}
