//! CLI Request Tests
//!
//! End-to-end requests against a fixture-seeded store:
//! - Config files load fixtures into the store
//! - Every shape renders its documented response object
//! - Invocation errors come back as coded errors

use std::io::Write;
use std::sync::Arc;

use aerorepo::cli::{run_request, QueryRequest};
use aerorepo::store::{DocumentStore, InMemoryStore};
use aerorepo::RepositoryConfig;
use serde_json::{json, Value};
use tempfile::NamedTempFile;

// =============================================================================
// Helper Functions
// =============================================================================

fn fixture_config() -> (RepositoryConfig, NamedTempFile, NamedTempFile) {
    let mut fixtures = NamedTempFile::new().unwrap();
    let documents: Vec<Value> = (0..6)
        .map(|i| json!({"_id": format!("u{}", i), "name": format!("user{}", i), "age": 20 + i * 5}))
        .collect();
    write!(fixtures, "{}", json!({ "users": documents })).unwrap();

    let mut config = NamedTempFile::new().unwrap();
    write!(
        config,
        "{}",
        json!({
            "cursor_batch_size": 2,
            "max_page_size": 4,
            "default_page_size": 2,
            "fixtures": fixtures.path()
        })
    )
    .unwrap();

    let loaded = RepositoryConfig::load(config.path()).unwrap();
    (loaded, config, fixtures)
}

async fn run(config: &RepositoryConfig, store: &InMemoryStore, value: Value) -> aerorepo::QueryResult<Value> {
    let request = QueryRequest::from_value(value).unwrap();
    let shared: Arc<dyn DocumentStore> = Arc::new(store.clone());
    run_request(config, shared, &request).await
}

// =============================================================================
// Shape Tests
// =============================================================================

/// Slice responses carry has_next and only the requested window.
#[tokio::test]
async fn test_slice_request() {
    let (config, _c, _f) = fixture_config();
    let store = config.open_store().unwrap();

    let data = run(
        &config,
        &store,
        json!({
            "collection": "users",
            "shape": "slice",
            "filter": {"age": {"$gte": "?0"}},
            "params": [30],
            "sort": [{"field": "age", "direction": "asc"}],
            "page": {"number": 0, "size": 2}
        }),
    )
    .await
    .unwrap();

    assert_eq!(data["has_next"], true);
    assert_eq!(data["page_size"], 2);
    let ages: Vec<i64> = data["content"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["age"].as_i64().unwrap())
        .collect();
    assert_eq!(ages, vec![30, 35]);
}

/// Delete responses list the removed entities with mapped ids.
#[tokio::test]
async fn test_delete_request() {
    let (config, _c, _f) = fixture_config();
    let store = config.open_store().unwrap();

    let data = run(
        &config,
        &store,
        json!({"collection": "users", "shape": "delete", "filter": {"age": {"$lt": 30}}}),
    )
    .await
    .unwrap();

    assert_eq!(data["deleted_count"], 2);
    let ids: Vec<&str> = data["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["u0", "u1"]);
    assert_eq!(store.documents("users").len(), 4);
}

/// Projected fields limit what each element carries.
#[tokio::test]
async fn test_fields_request() {
    let (config, _c, _f) = fixture_config();
    let store = config.open_store().unwrap();

    let data = run(
        &config,
        &store,
        json!({"collection": "users", "filter": {"_id": "u3"}, "fields": ["name"]}),
    )
    .await
    .unwrap();
    assert_eq!(data, json!([{"id": "u3", "name": "user3"}]));
}

/// The largest page number renders an empty last page.
#[tokio::test]
async fn test_last_possible_page_number() {
    let (config, _c, _f) = fixture_config();
    let store = config.open_store().unwrap();

    let data = run(
        &config,
        &store,
        json!({"collection": "users", "shape": "page", "page": {"number": u64::MAX, "size": 1}}),
    )
    .await
    .unwrap();

    assert_eq!(data["content"], json!([]));
    assert_eq!(data["page_number"], u64::MAX);
    assert_eq!(data["total_elements"], 6);
    assert_eq!(data["has_next"], false);
}

// =============================================================================
// Error Tests
// =============================================================================

/// A page above max_page_size is rejected before any command.
#[tokio::test]
async fn test_oversized_page_rejected() {
    let (config, _c, _f) = fixture_config();
    let store = config.open_store().unwrap();

    let err = run(
        &config,
        &store,
        json!({"collection": "users", "shape": "page", "page": {"size": 10}}),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "REPO_CONFIGURATION");
    assert_eq!(store.stats().commands, 0);
}

/// Unknown filter operators fail registration.
#[test]
fn test_unknown_operator_rejected() {
    let (config, _c, _f) = fixture_config();
    let store = config.open_store().unwrap();

    let request = QueryRequest::from_value(json!({"collection": "users", "filter": {"age": {"$near": 1}}}));
    let registered = request
        .unwrap()
        .register(&config, Arc::new(store.clone()));
    assert!(registered.err().unwrap().is_configuration());
}
