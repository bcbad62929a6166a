//! Authorization Tests
//!
//! A denied request fails with Forbidden and leaves documents, indexes and
//! aggregates untouched.

use std::sync::Arc;

use plusdb::aggregation::{AggregationConfiguration, AggregationValue};
use plusdb::auth::{ClientAuthorization, ScopeAuthorizer, ScopeType};
use plusdb::config::StoreConfig;
use plusdb::index::{Index, IndexConfiguration};
use plusdb::planner::{Predicate, Query};
use plusdb::schema::Collection;
use plusdb::store::{RequestContext, Store};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> Store {
    let clients = Arc::new(ScopeAuthorizer::new());
    clients
        .create_client_authorization(ClientAuthorization::read("reader", "restaurant"))
        .unwrap();
    clients
        .create_client_authorization(ClientAuthorization::read_write("writer", "restaurant"))
        .unwrap();

    let store = Store::new(
        StoreConfig {
            quiet: true,
            ..StoreConfig::default()
        },
        clients,
    );
    let admin = RequestContext::admin();
    store
        .create_collection(&admin, Collection::new("restaurant", "id"))
        .unwrap();
    store
        .create_collection(&admin, Collection::new("review", "id"))
        .unwrap();
    store
        .create_index(
            &admin,
            Index::new("restaurant", vec!["city".into()], None, IndexConfiguration::OptimizeRead),
        )
        .unwrap();
    store
        .create_aggregation(&admin, AggregationConfiguration::count("restaurant"))
        .unwrap();
    store
        .create_document(&admin, "restaurant", json!({"id": "r1", "city": "Oslo"}), None)
        .unwrap();
    store
}

fn restaurant_count(store: &Store) -> AggregationValue {
    store
        .get_aggregation(&RequestContext::admin(), "restaurant", "restaurant__collection_count")
        .unwrap()
        .aggregation
        .unwrap()
}

fn oslo_count(store: &Store) -> usize {
    let query = Query::new("restaurant").with_predicate(Predicate::eq("city", json!("Oslo")));
    store.query(&RequestContext::admin(), &query).unwrap().data.len()
}

// =============================================================================
// Denial Tests
// =============================================================================

#[test]
fn test_read_only_client_cannot_create() {
    let store = setup();
    let err = store
        .create_document(
            &RequestContext::client("reader"),
            "restaurant",
            json!({"id": "r2", "city": "Oslo"}),
            None,
        )
        .unwrap_err();
    assert_eq!(err.kind(), "Forbidden");
    assert_eq!(err.status_code(), 403);

    assert!(store.get_document(&RequestContext::admin(), "restaurant", "r2").is_err());
    assert_eq!(oslo_count(&store), 1);
    assert_eq!(restaurant_count(&store), AggregationValue::Count { count: 1 });
    assert_eq!(store.metrics().forbidden_requests, 1);
}

#[test]
fn test_client_outside_granted_collection() {
    let store = setup();
    let err = store
        .create_document(
            &RequestContext::client("writer"),
            "review",
            json!({"id": "v1"}),
            None,
        )
        .unwrap_err();
    assert_eq!(err.kind(), "Forbidden");

    let err = store
        .query(&RequestContext::client("writer"), &Query::new("review"))
        .unwrap_err();
    assert_eq!(err.kind(), "Forbidden");
    assert!(store.get_document(&RequestContext::admin(), "review", "v1").is_err());
}

#[test]
fn test_denied_delete_keeps_document() {
    let store = setup();
    let err = store
        .delete_document(&RequestContext::client("reader"), "restaurant", "r1", None, None)
        .unwrap_err();
    assert_eq!(err.kind(), "Forbidden");
    assert_eq!(oslo_count(&store), 1);
    assert_eq!(restaurant_count(&store), AggregationValue::Count { count: 1 });
}

#[test]
fn test_unregistered_client_denied() {
    let store = setup();
    let err = store
        .get_document(&RequestContext::client("stranger"), "restaurant", "r1")
        .unwrap_err();
    assert_eq!(err.kind(), "Forbidden");
}

#[test]
fn test_denial_precedes_existence_check() {
    let store = setup();
    let err = store
        .get_document(&RequestContext::client("reader"), "ghost", "1")
        .unwrap_err();
    assert_eq!(err.kind(), "Forbidden");
}

#[test]
fn test_clients_cannot_manage_aggregations() {
    let store = setup();
    let err = store
        .create_aggregation(
            &RequestContext::client("writer"),
            AggregationConfiguration::sum("restaurant", "seats"),
        )
        .unwrap_err();
    assert_eq!(err.kind(), "Forbidden");
    let listed = store
        .list_aggregations(&RequestContext::admin(), "restaurant", None, None)
        .unwrap();
    assert_eq!(listed.data.len(), 1);
}

// =============================================================================
// Granted Tests
// =============================================================================

#[test]
fn test_read_only_client_may_read() {
    let store = setup();
    let reader = RequestContext::client("reader");
    let doc = store.get_document(&reader, "restaurant", "r1").unwrap();
    assert_eq!(doc.document["city"], "Oslo");
    let page = store.query(&reader, &Query::new("restaurant")).unwrap();
    assert_eq!(page.data.len(), 1);
    let count = store
        .get_aggregation(&reader, "restaurant", "restaurant__collection_count")
        .unwrap();
    assert_eq!(count.aggregation, Some(AggregationValue::Count { count: 1 }));
}

#[test]
fn test_writer_mutations_apply() {
    let store = setup();
    let writer = RequestContext::client("writer");
    store
        .create_document(&writer, "restaurant", json!({"id": "r2", "city": "Oslo"}), None)
        .unwrap();
    assert_eq!(oslo_count(&store), 2);
    assert_eq!(restaurant_count(&store), AggregationValue::Count { count: 2 });
}

#[test]
fn test_narrow_grant() {
    let clients = ScopeAuthorizer::new();
    let auth = ClientAuthorization::new("deleter").grant("restaurant", [ScopeType::Delete]);
    clients.create_client_authorization(auth).unwrap();
    let store = Store::new(
        StoreConfig {
            quiet: true,
            ..StoreConfig::default()
        },
        Arc::new(clients),
    );
    let admin = RequestContext::admin();
    store
        .create_collection(&admin, Collection::new("restaurant", "id"))
        .unwrap();
    store
        .create_document(&admin, "restaurant", json!({"id": "r1"}), None)
        .unwrap();

    let deleter = RequestContext::client("deleter");
    assert_eq!(
        store.get_document(&deleter, "restaurant", "r1").unwrap_err().kind(),
        "Forbidden"
    );
    store
        .delete_document(&deleter, "restaurant", "r1", None, None)
        .unwrap();
}
