//! API request types
//!
//! A request is one JSON object carrying an `op`, the acting `principal`
//! and the operation's arguments as sibling fields.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::errors::{ApiError, ApiResult};
use crate::aggregation::AggregationConfiguration;
use crate::auth::{ClientAuthorization, Principal};
use crate::index::{Index, IndexConfiguration};
use crate::planner::Query;
use crate::schema::Collection;

/// Raw request envelope before op-specific parsing
#[derive(Debug, Deserialize)]
pub struct RawRequest {
    pub op: String,
    #[serde(default)]
    pub principal: Option<Principal>,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

/// Index definition as submitted; the name and uid are derived
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSpec {
    pub collection: String,
    pub conditions: Vec<String>,
    #[serde(default)]
    pub ordering_key: Option<String>,
    #[serde(default)]
    pub configuration: IndexConfiguration,
}

impl IndexSpec {
    pub fn into_index(self) -> Index {
        Index::new(self.collection, self.conditions, self.ordering_key, self.configuration)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionArgs {
    pub collection: Collection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NameArgs {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageArgs {
    #[serde(default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexArgs {
    pub index: IndexSpec,
}

/// Names an index or aggregation within a collection
#[derive(Debug, Clone, Deserialize)]
pub struct MemberArgs {
    pub collection: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberListArgs {
    pub collection: String,
    #[serde(default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregationArgs {
    pub aggregation: AggregationConfiguration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientArgs {
    pub client: ClientAuthorization,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientIdArgs {
    pub client_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocumentArgs {
    pub collection: String,
    pub document: Value,
    #[serde(default)]
    pub attempt_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentIdArgs {
    pub collection: String,
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDocumentArgs {
    pub collection: String,
    pub id: String,
    pub document: Value,
    #[serde(default)]
    pub expected_revision: Option<u64>,
    #[serde(default)]
    pub attempt_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteDocumentArgs {
    pub collection: String,
    pub id: String,
    #[serde(default)]
    pub expected_revision: Option<u64>,
    #[serde(default)]
    pub attempt_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryArgs {
    pub query: Query,
}

/// Parsed operation
#[derive(Debug, Clone)]
pub enum Operation {
    CreateCollection(CollectionArgs),
    GetCollection(NameArgs),
    ListCollections(PageArgs),
    DeleteCollection(NameArgs),
    CreateIndex(IndexArgs),
    GetIndex(MemberArgs),
    ListIndexes(MemberListArgs),
    DeleteIndex(MemberArgs),
    CreateAggregation(AggregationArgs),
    GetAggregation(MemberArgs),
    ListAggregations(MemberListArgs),
    DeleteAggregation(MemberArgs),
    CreateClient(ClientArgs),
    GetClient(ClientIdArgs),
    DeleteClient(ClientIdArgs),
    CreateDocument(CreateDocumentArgs),
    GetDocument(DocumentIdArgs),
    UpdateDocument(UpdateDocumentArgs),
    DeleteDocument(DeleteDocumentArgs),
    Query(QueryArgs),
    Explain(QueryArgs),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateCollection(_) => "create_collection",
            Operation::GetCollection(_) => "get_collection",
            Operation::ListCollections(_) => "list_collections",
            Operation::DeleteCollection(_) => "delete_collection",
            Operation::CreateIndex(_) => "create_index",
            Operation::GetIndex(_) => "get_index",
            Operation::ListIndexes(_) => "list_indexes",
            Operation::DeleteIndex(_) => "delete_index",
            Operation::CreateAggregation(_) => "create_aggregation",
            Operation::GetAggregation(_) => "get_aggregation",
            Operation::ListAggregations(_) => "list_aggregations",
            Operation::DeleteAggregation(_) => "delete_aggregation",
            Operation::CreateClient(_) => "create_client",
            Operation::GetClient(_) => "get_client",
            Operation::DeleteClient(_) => "delete_client",
            Operation::CreateDocument(_) => "create_document",
            Operation::GetDocument(_) => "get_document",
            Operation::UpdateDocument(_) => "update_document",
            Operation::DeleteDocument(_) => "delete_document",
            Operation::Query(_) => "query",
            Operation::Explain(_) => "explain",
        }
    }
}

/// A parsed request: who is asking, and for what
#[derive(Debug, Clone)]
pub struct Request {
    pub principal: Principal,
    pub operation: Operation,
}

fn args<T: DeserializeOwned>(op: &str, body: Map<String, Value>) -> ApiResult<T> {
    serde_json::from_value(Value::Object(body))
        .map_err(|e| ApiError::invalid_request(format!("Invalid arguments for {}: {}", op, e)))
}

impl Request {
    /// Parse a request from a JSON string
    pub fn parse(json: &str) -> ApiResult<Self> {
        let raw: RawRequest = serde_json::from_str(json)
            .map_err(|e| ApiError::invalid_request(format!("Invalid JSON: {}", e)))?;
        Self::from_raw(raw)
    }

    pub fn from_raw(raw: RawRequest) -> ApiResult<Self> {
        let RawRequest { op, principal, body } = raw;
        let principal = principal.ok_or_else(|| ApiError::invalid_request("Missing 'principal' field"))?;

        let operation = match op.as_str() {
            "create_collection" => Operation::CreateCollection(args(&op, body)?),
            "get_collection" => Operation::GetCollection(args(&op, body)?),
            "list_collections" => Operation::ListCollections(args(&op, body)?),
            "delete_collection" => Operation::DeleteCollection(args(&op, body)?),
            "create_index" => Operation::CreateIndex(args(&op, body)?),
            "get_index" => Operation::GetIndex(args(&op, body)?),
            "list_indexes" => Operation::ListIndexes(args(&op, body)?),
            "delete_index" => Operation::DeleteIndex(args(&op, body)?),
            "create_aggregation" => Operation::CreateAggregation(args(&op, body)?),
            "get_aggregation" => Operation::GetAggregation(args(&op, body)?),
            "list_aggregations" => Operation::ListAggregations(args(&op, body)?),
            "delete_aggregation" => Operation::DeleteAggregation(args(&op, body)?),
            "create_client" => Operation::CreateClient(args(&op, body)?),
            "get_client" => Operation::GetClient(args(&op, body)?),
            "delete_client" => Operation::DeleteClient(args(&op, body)?),
            "create_document" => Operation::CreateDocument(args(&op, body)?),
            "get_document" => Operation::GetDocument(args(&op, body)?),
            "update_document" => Operation::UpdateDocument(args(&op, body)?),
            "delete_document" => Operation::DeleteDocument(args(&op, body)?),
            "query" => Operation::Query(args(&op, body)?),
            "explain" => Operation::Explain(args(&op, body)?),
            _ => return Err(ApiError::unknown_operation(op)),
        };

        Ok(Request { principal, operation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_document() {
        let req = Request::parse(
            r#"{"op":"create_document","principal":"admin","collection":"book","document":{"isbn":"1"},"attempt_id":"a-1"}"#,
        )
        .unwrap();
        assert_eq!(req.principal, Principal::Admin);
        match req.operation {
            Operation::CreateDocument(a) => {
                assert_eq!(a.collection, "book");
                assert_eq!(a.attempt_id.as_deref(), Some("a-1"));
            }
            other => panic!("unexpected operation {}", other.name()),
        }
    }

    #[test]
    fn test_parse_client_principal() {
        let req = Request::parse(
            r#"{"op":"get_document","principal":{"client":"reader"},"collection":"book","id":"1"}"#,
        )
        .unwrap();
        assert_eq!(req.principal, Principal::client("reader"));
        assert_eq!(req.operation.name(), "get_document");
    }

    #[test]
    fn test_parse_index_spec_derives_name() {
        let req = Request::parse(
            r#"{"op":"create_index","principal":"admin","index":{"collection":"book","conditions":["category"],"orderingKey":"title"}}"#,
        )
        .unwrap();
        match req.operation {
            Operation::CreateIndex(a) => {
                let index = a.index.into_index();
                assert_eq!(index.name, "book__category");
                assert_eq!(index.ordering_key.as_deref(), Some("title"));
            }
            other => panic!("unexpected operation {}", other.name()),
        }
    }

    #[test]
    fn test_parse_unknown_op() {
        let err = Request::parse(r#"{"op":"drop_everything","principal":"admin"}"#).unwrap_err();
        assert_eq!(err.code(), "PLUS_UNKNOWN_OPERATION");
    }

    #[test]
    fn test_parse_missing_principal() {
        let err = Request::parse(r#"{"op":"list_collections"}"#).unwrap_err();
        assert_eq!(err.code(), "PLUS_INVALID_REQUEST");
    }

    #[test]
    fn test_parse_missing_arguments() {
        let err = Request::parse(r#"{"op":"get_document","principal":"admin","collection":"book"}"#).unwrap_err();
        assert_eq!(err.code(), "PLUS_INVALID_REQUEST");
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(Request::parse("{not json").is_err());
    }
}
