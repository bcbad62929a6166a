//! Result types for query execution

use serde::{Deserialize, Serialize};

/// One page of an ordered listing.
///
/// `last_key` is set exactly when `has_more` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult<T> {
    pub data: Vec<T>,
    pub last_key: Option<String>,
    pub has_more: bool,
}

impl<T> PaginatedResult<T> {
    pub fn complete(data: Vec<T>) -> Self {
        Self {
            data,
            last_key: None,
            has_more: false,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Converts the items, keeping the continuation token
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            data: self.data.into_iter().map(f).collect(),
            last_key: self.last_key,
            has_more: self.has_more,
        }
    }
}

/// Result of query execution
#[derive(Debug, Clone)]
pub struct ExecutionResult<T> {
    pub page: PaginatedResult<T>,
    /// Candidates examined, including those rejected by residual filters
    pub scanned_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let page = PaginatedResult {
            data: vec![json!({"name": "Pulp"})],
            last_key: Some("abc".into()),
            has_more: true,
        };
        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            json!({"data": [{"name": "Pulp"}], "lastKey": "abc", "hasMore": true})
        );

        let last = PaginatedResult::complete(vec![1, 2]);
        assert_eq!(
            serde_json::to_value(&last).unwrap(),
            json!({"data": [1, 2], "lastKey": null, "hasMore": false})
        );
    }

    #[test]
    fn test_map_keeps_token() {
        let page = PaginatedResult {
            data: vec![1, 2],
            last_key: Some("k".into()),
            has_more: true,
        };
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.data, vec![10, 20]);
        assert_eq!(mapped.last_key.as_deref(), Some("k"));
    }
}
