//! API request handler
//!
//! Every request flows through:
//! 1. Parse the JSON envelope
//! 2. Build a request context for the principal
//! 3. Dispatch to the store (or the client registry)
//! 4. Serialize the result or error

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::errors::{ApiError, ApiResult};
use super::request::{Operation, Request};
use super::response::Response;
use crate::auth::{Authorizer, ScopeAuthorizer};
use crate::observability::{Event, Logger};
use crate::store::{RequestContext, Store, StoreError};

/// Stateless front over a shared store
pub struct ApiHandler {
    store: Arc<Store>,
    clients: Arc<ScopeAuthorizer>,
    logger: Logger,
}

fn to_data<T: Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(ApiError::serialization)
}

impl ApiHandler {
    /// `clients` must be the same registry the store authorizes against.
    pub fn new(store: Arc<Store>, clients: Arc<ScopeAuthorizer>) -> Self {
        let logger = Logger::with_quiet(store.config().quiet);
        Self { store, clients, logger }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Handle one JSON request and return its response
    pub fn handle(&self, json: &str) -> Response {
        match Request::parse(json).and_then(|request| self.dispatch(request)) {
            Ok(data) => Response::success(data),
            Err(err) => Response::error(&err),
        }
    }

    pub fn dispatch(&self, request: Request) -> ApiResult<Value> {
        let ctx = RequestContext::new(request.principal);
        let store = &self.store;

        match request.operation {
            Operation::CreateCollection(a) => to_data(&store.create_collection(&ctx, a.collection)?),
            Operation::GetCollection(a) => to_data(&store.get_collection(&ctx, &a.name)?),
            Operation::ListCollections(a) => {
                to_data(&store.list_collections(&ctx, a.page_size, a.cursor.as_deref())?)
            }
            Operation::DeleteCollection(a) => to_data(&store.delete_collection(&ctx, &a.name)?),

            Operation::CreateIndex(a) => to_data(&store.create_index(&ctx, a.index.into_index())?),
            Operation::GetIndex(a) => to_data(&store.get_index(&ctx, &a.collection, &a.name)?),
            Operation::ListIndexes(a) => to_data(&store.list_indexes(
                &ctx,
                &a.collection,
                a.page_size,
                a.cursor.as_deref(),
            )?),
            Operation::DeleteIndex(a) => to_data(&store.delete_index(&ctx, &a.collection, &a.name)?),

            Operation::CreateAggregation(a) => to_data(&store.create_aggregation(&ctx, a.aggregation)?),
            Operation::GetAggregation(a) => {
                to_data(&store.get_aggregation(&ctx, &a.collection, &a.name)?)
            }
            Operation::ListAggregations(a) => to_data(&store.list_aggregations(
                &ctx,
                &a.collection,
                a.page_size,
                a.cursor.as_deref(),
            )?),
            Operation::DeleteAggregation(a) => {
                to_data(&store.delete_aggregation(&ctx, &a.collection, &a.name)?)
            }

            Operation::CreateClient(a) => {
                self.require_admin(&ctx, "manage clients")?;
                let client = self
                    .clients
                    .create_client_authorization(a.client)
                    .map_err(StoreError::from)?;
                let request_id = ctx.request_id.to_string();
                self.logger.event(
                    Event::ClientAuthorized,
                    &[
                        ("client", client.client_id.as_str()),
                        ("request_id", request_id.as_str()),
                    ],
                );
                to_data(&client)
            }
            Operation::GetClient(a) => {
                self.require_admin(&ctx, "manage clients")?;
                let client = self
                    .clients
                    .get_client_authorization(&a.client_id)
                    .map_err(StoreError::from)?;
                to_data(&client)
            }
            Operation::DeleteClient(a) => {
                self.require_admin(&ctx, "manage clients")?;
                self.clients
                    .delete_client_authorization(&a.client_id)
                    .map_err(StoreError::from)?;
                Ok(serde_json::json!({ "clientId": a.client_id }))
            }

            Operation::CreateDocument(a) => to_data(&store.create_document(
                &ctx,
                &a.collection,
                a.document,
                a.attempt_id.as_deref(),
            )?),
            Operation::GetDocument(a) => to_data(&store.get_document(&ctx, &a.collection, &a.id)?),
            Operation::UpdateDocument(a) => to_data(&store.update_document(
                &ctx,
                &a.collection,
                &a.id,
                a.document,
                a.expected_revision,
                a.attempt_id.as_deref(),
            )?),
            Operation::DeleteDocument(a) => to_data(&store.delete_document(
                &ctx,
                &a.collection,
                &a.id,
                a.expected_revision,
                a.attempt_id.as_deref(),
            )?),

            Operation::Query(a) => to_data(&store.query(&ctx, &a.query)?),
            Operation::Explain(a) => to_data(&store.explain(&ctx, &a.query)?),
        }
    }

    fn require_admin(&self, ctx: &RequestContext, action: &str) -> ApiResult<()> {
        self.clients
            .authorize_admin(&ctx.principal, action)
            .map_err(|e| StoreError::from(e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use serde_json::json;

    fn handler() -> ApiHandler {
        let clients = Arc::new(ScopeAuthorizer::new());
        let config = StoreConfig {
            quiet: true,
            ..StoreConfig::default()
        };
        let store = Arc::new(Store::new(config, clients.clone()));
        ApiHandler::new(store, clients)
    }

    fn call(h: &ApiHandler, request: Value) -> Response {
        h.handle(&request.to_string())
    }

    fn setup_books(h: &ApiHandler) {
        let resp = call(
            h,
            json!({
                "op": "create_collection",
                "principal": "admin",
                "collection": {
                    "name": "book",
                    "idKey": "isbn",
                    "fields": [
                        {"name": "isbn", "type": "STRING", "constraints": ["NOT_NULL"]},
                        {"name": "title", "type": "STRING"},
                        {"name": "category", "type": "STRING"}
                    ]
                }
            }),
        );
        assert!(resp.is_success(), "{}", resp.to_json());
        let resp = call(
            h,
            json!({
                "op": "create_index",
                "principal": "admin",
                "index": {"collection": "book", "conditions": ["category"], "orderingKey": "title"}
            }),
        );
        assert!(resp.is_success(), "{}", resp.to_json());
    }

    #[test]
    fn test_document_and_query_flow() {
        let h = handler();
        setup_books(&h);
        for (isbn, title, category) in [("1", "Dune", "SF"), ("2", "Emma", "Classic"), ("3", "Anathem", "SF")] {
            let resp = call(
                &h,
                json!({
                    "op": "create_document",
                    "principal": "admin",
                    "collection": "book",
                    "document": {"isbn": isbn, "title": title, "category": category}
                }),
            );
            assert!(resp.is_success(), "{}", resp.to_json());
        }

        let resp = call(
            &h,
            json!({
                "op": "query",
                "principal": "admin",
                "query": {"collection": "book", "predicate": {"eq": {"field": "category", "value": "SF"}}}
            }),
        );
        let data = resp.data().cloned().unwrap();
        let titles: Vec<&str> = data["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Anathem", "Dune"]);
    }

    #[test]
    fn test_unknown_operation_response() {
        let h = handler();
        let resp = h.handle(r#"{"op":"vacuum","principal":"admin"}"#);
        assert_eq!(resp.error_code(), Some("PLUS_UNKNOWN_OPERATION"));
    }

    #[test]
    fn test_client_cannot_manage_clients() {
        let h = handler();
        let resp = call(
            &h,
            json!({
                "op": "create_client",
                "principal": {"client": "mallory"},
                "client": {"clientId": "mallory", "clientScopes": []}
            }),
        );
        assert_eq!(resp.error_code(), Some("PLUS_FORBIDDEN"));
        assert_eq!(resp.to_value()["http_status"], 403);
    }

    #[test]
    fn test_registered_client_scopes_apply() {
        let h = handler();
        setup_books(&h);
        let resp = call(
            &h,
            json!({
                "op": "create_client",
                "principal": "admin",
                "client": {
                    "clientId": "reader",
                    "clientScopes": [{"collection": "book", "scopes": ["GET", "QUERY"]}]
                }
            }),
        );
        assert!(resp.is_success(), "{}", resp.to_json());

        let resp = call(
            &h,
            json!({
                "op": "create_document",
                "principal": {"client": "reader"},
                "collection": "book",
                "document": {"isbn": "9", "title": "Nope"}
            }),
        );
        assert_eq!(resp.error_code(), Some("PLUS_FORBIDDEN"));

        let resp = call(
            &h,
            json!({
                "op": "query",
                "principal": {"client": "reader"},
                "query": {"collection": "book"}
            }),
        );
        assert!(resp.is_success(), "{}", resp.to_json());
        assert_eq!(resp.data().unwrap()["data"], json!([]));
    }

    #[test]
    fn test_store_error_codes_pass_through() {
        let h = handler();
        let resp = call(
            &h,
            json!({"op": "get_document", "principal": "admin", "collection": "ghost", "id": "1"}),
        );
        assert_eq!(resp.to_value()["status"], "error");
        assert_eq!(resp.to_value()["http_status"], 404);
    }
}
