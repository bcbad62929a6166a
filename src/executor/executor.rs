//! Query executor
//!
//! Executes query plans against a collection's documents and indexes.
//!
//! Execution flow (strict order):
//! 1. Decode and verify the cursor against the plan's scan
//! 2. Walk candidates in scan order, strictly after the cursor position
//! 3. Fetch each candidate document
//! 4. Apply residual filters
//! 5. Stop after `page_size` matches; one more match sets `has_more`
//! 6. Encode the position of the last returned item

use std::collections::BTreeMap;
use std::ops::Bound;

use serde_json::Value;

use super::cursor::{Cursor, ScanPosition};
use super::errors::{ExecutorError, ExecutorResult};
use super::filters::PredicateFilter;
use super::result::{ExecutionResult, PaginatedResult};
use crate::index::{EntryKey, IndexManager, IndexTree};
use crate::planner::QueryPlan;
use crate::schema::Collection;

/// Read access to a collection's documents in identity order
pub trait DocumentSource {
    /// Documents with identity strictly greater than `after`
    fn scan_after<'a>(&'a self, after: Option<&str>) -> Box<dyn Iterator<Item = (&'a str, &'a Value)> + 'a>;

    fn fetch(&self, id: &str) -> Option<&Value>;
}

impl DocumentSource for BTreeMap<String, Value> {
    fn scan_after<'a>(&'a self, after: Option<&str>) -> Box<dyn Iterator<Item = (&'a str, &'a Value)> + 'a> {
        let lower = match after {
            Some(id) => Bound::Excluded(id.to_string()),
            None => Bound::Unbounded,
        };
        Box::new(
            self.range::<String, _>((lower, Bound::Unbounded))
                .map(|(id, doc)| (id.as_str(), doc)),
        )
    }

    fn fetch(&self, id: &str) -> Option<&Value> {
        self.get(id)
    }
}

/// Trait for looking up index entries by name
pub trait IndexLookup {
    fn index_tree(&self, name: &str) -> Option<&IndexTree>;
}

impl IndexLookup for IndexManager {
    fn index_tree(&self, name: &str) -> Option<&IndexTree> {
        self.tree(name).map(|(_, tree)| tree)
    }
}

/// Validates a requested page size; `None` means the whole remaining set
/// unless a default is configured. Sizes above `max` are clamped.
pub fn resolve_page_size(requested: Option<usize>, default: Option<usize>, max: usize) -> ExecutorResult<Option<usize>> {
    match requested.or(default) {
        Some(0) => Err(ExecutorError::invalid_page_size()),
        Some(n) => Ok(Some(n.min(max))),
        None => Ok(None),
    }
}

#[derive(Clone, Copy)]
enum Candidate<'d> {
    Identity(&'d str),
    Entry(&'d EntryKey),
}

impl Candidate<'_> {
    fn position(&self) -> ScanPosition {
        match self {
            Candidate::Identity(id) => ScanPosition::Identity { id: id.to_string() },
            Candidate::Entry(entry) => ScanPosition::Entry {
                entry: (*entry).clone(),
            },
        }
    }
}

/// Query executor over one collection
pub struct QueryExecutor<'a, D: DocumentSource, I: IndexLookup> {
    collection: &'a Collection,
    documents: &'a D,
    indexes: &'a I,
}

impl<'a, D: DocumentSource, I: IndexLookup> QueryExecutor<'a, D, I> {
    pub fn new(collection: &'a Collection, documents: &'a D, indexes: &'a I) -> Self {
        Self {
            collection,
            documents,
            indexes,
        }
    }

    /// Executes a query plan and returns one page.
    ///
    /// Same plan, data and cursor always give the same page.
    pub fn execute(
        &self,
        plan: &QueryPlan,
        page_size: Option<usize>,
        cursor: Option<&str>,
    ) -> ExecutorResult<ExecutionResult<Value>> {
        if page_size == Some(0) {
            return Err(ExecutorError::invalid_page_size());
        }
        let scan = plan.scan_id();
        let cursor = cursor.map(|token| Cursor::decode(token, &scan)).transpose()?;
        let filter = PredicateFilter::new(self.collection, &plan.residual);

        match &plan.index {
            None => {
                let after = cursor.as_ref().map(Cursor::identity).transpose()?;
                let candidates = self
                    .documents
                    .scan_after(after)
                    .map(|(id, doc)| Ok((Candidate::Identity(id), doc)));
                collect_page(&scan, candidates, &filter, page_size)
            }
            Some(name) => {
                let tree = self
                    .indexes
                    .index_tree(name)
                    .ok_or_else(|| ExecutorError::execution_failed(format!("index '{}' vanished", name)))?;
                let after = cursor.as_ref().map(Cursor::entry).transpose()?;
                let candidates = tree.scan(&plan.bounds, after).map(|entry| {
                    self.documents
                        .fetch(&entry.id)
                        .map(|doc| (Candidate::Entry(entry), doc))
                        .ok_or_else(|| {
                            ExecutorError::execution_failed(format!(
                                "index '{}' references missing document '{}'",
                                name, entry.id
                            ))
                        })
                });
                collect_page(&scan, candidates, &filter, page_size)
            }
        }
    }
}

fn collect_page<'d>(
    scan: &str,
    candidates: impl Iterator<Item = ExecutorResult<(Candidate<'d>, &'d Value)>>,
    filter: &PredicateFilter<'_>,
    page_size: Option<usize>,
) -> ExecutorResult<ExecutionResult<Value>> {
    let limit = page_size.unwrap_or(usize::MAX);
    let mut data = Vec::new();
    let mut last: Option<Candidate<'d>> = None;
    let mut has_more = false;
    let mut scanned_count = 0;

    for candidate in candidates {
        let (position, document) = candidate?;
        scanned_count += 1;
        if !filter.matches(document) {
            continue;
        }
        if data.len() == limit {
            has_more = true;
            break;
        }
        data.push(document.clone());
        last = Some(position);
    }

    let last_key = match (has_more, last) {
        (true, Some(position)) => Some(Cursor::new(scan, position.position()).encode()?),
        _ => None,
    };
    Ok(ExecutionResult {
        page: PaginatedResult {
            data,
            has_more: last_key.is_some(),
            last_key,
        },
        scanned_count,
    })
}

/// Pages through items already sorted by a unique key.
pub fn paginate<'a, T: Clone + 'a>(
    scan: &str,
    items: impl IntoIterator<Item = (&'a str, &'a T)>,
    page_size: Option<usize>,
    cursor: Option<&str>,
) -> ExecutorResult<PaginatedResult<T>> {
    if page_size == Some(0) {
        return Err(ExecutorError::invalid_page_size());
    }
    let cursor = cursor.map(|token| Cursor::decode(token, scan)).transpose()?;
    let after = cursor.as_ref().map(Cursor::identity).transpose()?;
    let limit = page_size.unwrap_or(usize::MAX);

    let mut data = Vec::new();
    let mut last = None;
    let mut has_more = false;
    for (key, item) in items {
        if after.map_or(false, |a| key <= a) {
            continue;
        }
        if data.len() == limit {
            has_more = true;
            break;
        }
        data.push(item.clone());
        last = Some(key);
    }

    let last_key = match (has_more, last) {
        (true, Some(key)) => Some(Cursor::new(scan, ScanPosition::Identity { id: key.to_string() }).encode()?),
        _ => None,
    };
    Ok(PaginatedResult {
        data,
        has_more: last_key.is_some(),
        last_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorErrorCode;
    use crate::index::{Index, IndexConfiguration};
    use crate::planner::{Predicate, Query, QueryPlanner};
    use serde_json::json;
    use std::collections::BTreeSet;

    struct Fixture {
        collection: Collection,
        documents: BTreeMap<String, Value>,
        indexes: IndexManager,
    }

    fn fixture() -> Fixture {
        let collection = Collection::new("book", "isbn");
        let mut documents = BTreeMap::new();
        for (isbn, cat, rating) in [
            ("1", "Pulp", "08"),
            ("2", "Pulp", "07"),
            ("3", "Pulp", "05"),
            ("4", "Pulp", "06"),
            ("5", "Thriller", "07"),
        ] {
            documents.insert(
                isbn.to_string(),
                json!({"isbn": isbn, "category": {"name": cat}, "rating": rating}),
            );
        }
        let mut indexes = IndexManager::new();
        let index = Index::new(
            "book",
            vec!["category.name".into(), "rating".into()],
            Some("rating".into()),
            IndexConfiguration::OptimizeRead,
        );
        indexes
            .create(&collection, index, &BTreeSet::new(), documents.iter().map(|(id, d)| (id.as_str(), d)))
            .unwrap();
        Fixture {
            collection,
            documents,
            indexes,
        }
    }

    fn run(f: &Fixture, query: &Query, cursor: Option<&str>) -> ExecutorResult<ExecutionResult<Value>> {
        let plan = QueryPlanner::new(&f.collection, &f.indexes).plan(query).unwrap();
        QueryExecutor::new(&f.collection, &f.documents, &f.indexes).execute(&plan, query.page_size, cursor)
    }

    fn isbns(page: &PaginatedResult<Value>) -> Vec<String> {
        page.data.iter().map(|d| d["isbn"].as_str().unwrap().to_string()).collect()
    }

    #[test]
    fn test_composite_range() {
        let f = fixture();
        let query = Query::new("book").with_predicate(Predicate::and(vec![
            Predicate::eq("category.name", json!("Pulp")),
            Predicate::range("rating", Some(json!("07")), Some(json!("09"))),
        ]));
        let result = run(&f, &query, None).unwrap();
        assert_eq!(isbns(&result.page), vec!["2", "1"]);
        assert!(!result.page.has_more);
        assert_eq!(result.page.last_key, None);
    }

    #[test]
    fn test_full_scan_with_residual() {
        let f = fixture();
        let query = Query::new("book").with_predicate(Predicate::eq("rating", json!("07")));
        let result = run(&f, &query, None).unwrap();
        assert_eq!(isbns(&result.page), vec!["2", "5"]);
        assert_eq!(result.scanned_count, 5);
    }

    #[test]
    fn test_pages_concatenate_to_full_scan() {
        let f = fixture();
        let all = isbns(&run(&f, &Query::new("book"), None).unwrap().page);

        let query = Query::new("book").with_page_size(2);
        let mut collected = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = run(&f, &query, cursor.as_deref()).unwrap().page;
            assert!(page.len() <= 2);
            collected.extend(isbns(&page));
            assert_eq!(page.has_more, page.last_key.is_some());
            if !page.has_more {
                break;
            }
            cursor = page.last_key;
        }
        assert_eq!(collected, all);
    }

    #[test]
    fn test_index_pagination() {
        let f = fixture();
        let query = Query::new("book")
            .with_index("book__category.name__rating")
            .with_predicate(Predicate::eq("category.name", json!("Pulp")))
            .with_page_size(3);
        let first = run(&f, &query, None).unwrap().page;
        assert_eq!(isbns(&first), vec!["3", "4", "2"]);
        assert!(first.has_more);
        let second = run(&f, &query, first.last_key.as_deref()).unwrap().page;
        assert_eq!(isbns(&second), vec!["1"]);
        assert!(!second.has_more);
    }

    #[test]
    fn test_exact_page_boundary_has_no_more() {
        let f = fixture();
        let query = Query::new("book")
            .with_index("book__category.name__rating")
            .with_predicate(Predicate::eq("category.name", json!("Pulp")))
            .with_page_size(4);
        let page = run(&f, &query, None).unwrap().page;
        assert_eq!(page.len(), 4);
        assert!(!page.has_more);
    }

    #[test]
    fn test_cursor_from_other_scan_rejected() {
        let f = fixture();
        let scan_page = run(&f, &Query::new("book").with_page_size(1), None).unwrap().page;
        let query = Query::new("book")
            .with_index("book__category.name__rating")
            .with_page_size(1);
        let err = run(&f, &query, scan_page.last_key.as_deref()).unwrap_err();
        assert_eq!(err.code(), ExecutorErrorCode::PlusInvalidCursor);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let f = fixture();
        let err = run(&f, &Query::new("book").with_page_size(0), None).unwrap_err();
        assert_eq!(err.code(), ExecutorErrorCode::PlusInvalidPageSize);
    }

    #[test]
    fn test_resolve_page_size() {
        assert_eq!(resolve_page_size(None, None, 10).unwrap(), None);
        assert_eq!(resolve_page_size(None, Some(5), 10).unwrap(), Some(5));
        assert_eq!(resolve_page_size(Some(50), Some(5), 10).unwrap(), Some(10));
        assert!(resolve_page_size(Some(0), None, 10).is_err());
    }

    #[test]
    fn test_paginate_sorted_items() {
        let items: Vec<(String, u32)> = vec![("a".into(), 1), ("b".into(), 2), ("c".into(), 3)];
        let view = || items.iter().map(|(k, v)| (k.as_str(), v));
        let first = paginate("names", view(), Some(2), None).unwrap();
        assert_eq!(first.data, vec![1, 2]);
        let second = paginate("names", view(), Some(2), first.last_key.as_deref()).unwrap();
        assert_eq!(second.data, vec![3]);
        assert!(!second.has_more);
    }
}
