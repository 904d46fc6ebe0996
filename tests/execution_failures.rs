//! Execution Failure and Lifecycle Tests
//!
//! Behavior around the edges of an invocation:
//! - Nothing reaches the store before the outcome is polled
//! - Dropping a stream early releases its cursor
//! - A failing element ends the stream after the elements before it
//! - A failed count fails the whole page and leaks no cursor
//! - Dropping a pending page cancels its fetch and count together
//! - Method meta reaches every command of an invocation

use std::sync::Arc;

use aerorepo::convert::{JsonConverter, ResultProcessor};
use aerorepo::execution::DeleteMode;
use aerorepo::query::{Criteria, Meta, PageRequest, Query};
use aerorepo::repository::{ParameterAccessor, Parameters, QueryMethod, RepositoryQuery};
use aerorepo::store::{InMemoryStore, StoreError, StoreOp};
use aerorepo::{ErrorKind, Outcome, QueryResult, RepositoryConfig};
use futures_util::{FutureExt, StreamExt, TryStreamExt};
use serde::Deserialize;
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

#[derive(Debug, Deserialize, PartialEq)]
struct Person {
    id: String,
    age: u32,
}

fn people(count: usize) -> InMemoryStore {
    let store = InMemoryStore::with_batch_size(2);
    store
        .seed(
            "people",
            (0..count).map(|i| json!({"_id": format!("p{}", i), "age": 31 + i})),
        )
        .unwrap();
    store
}

fn register<R: Send + 'static>(
    method: QueryMethod,
    store: &InMemoryStore,
    processor: ResultProcessor<R>,
) -> RepositoryQuery<R> {
    RepositoryQuery::new(
        method,
        Arc::new(|_: &ParameterAccessor| -> QueryResult<Query> {
            Ok(Query::new(Criteria::field("age").gt(json!(30))))
        }),
        Arc::new(store.clone()),
        Arc::new(JsonConverter::default()),
        processor,
        &RepositoryConfig::default(),
    )
    .unwrap()
}

// =============================================================================
// Laziness Tests
// =============================================================================

/// Building an outcome of any shape issues no command.
#[tokio::test]
async fn test_no_command_before_poll() {
    let store = people(4);
    let methods = [
        QueryMethod::builder("one", "people").build().unwrap(),
        QueryMethod::builder("all", "people").collection().build().unwrap(),
        QueryMethod::builder("page", "people").page().build().unwrap(),
        QueryMethod::builder("slice", "people").slice().build().unwrap(),
        QueryMethod::builder("count", "people").count().build().unwrap(),
        QueryMethod::builder("remove", "people").delete().build().unwrap(),
    ];

    for method in methods {
        let name = method.name().to_string();
        let query = register(method, &store, ResultProcessor::<Value>::domain());
        let outcome = query.execute(Parameters::empty());
        drop(outcome);
        assert_eq!(store.stats().commands, 0, "{}", name);
    }
    assert_eq!(store.documents("people").len(), 4);
}

// =============================================================================
// Cancellation Tests
// =============================================================================

/// Taking K elements and dropping the stream closes the cursor.
#[tokio::test]
async fn test_drop_after_k_releases_cursor() {
    let store = people(10);
    let query = register(
        QueryMethod::builder("all", "people").collection().build().unwrap(),
        &store,
        ResultProcessor::<Person>::domain(),
    );

    let mut stream = query.execute(Parameters::empty()).into_stream();
    for _ in 0..3 {
        assert!(stream.next().await.unwrap().is_ok());
    }
    assert_eq!(store.stats().open_cursors(), 1);

    drop(stream);
    assert_eq!(store.stats().open_cursors(), 0);
    assert_eq!(store.stats().cursors_closed, 1);
}

// =============================================================================
// Failure Tests
// =============================================================================

/// Elements before a conversion failure are delivered, then the stream ends.
#[tokio::test]
async fn test_conversion_failure_mid_stream() {
    let store = InMemoryStore::with_batch_size(2);
    store
        .seed(
            "people",
            vec![
                json!({"_id": "p0", "age": 31}),
                json!({"_id": "p1", "age": 32}),
                json!({"_id": "p2", "age": "forty"}),
                json!({"_id": "p3", "age": 34}),
            ],
        )
        .unwrap();
    let query = RepositoryQuery::new(
        QueryMethod::builder("all", "people").collection().build().unwrap(),
        Arc::new(|_: &ParameterAccessor| -> QueryResult<Query> { Ok(Query::all()) }),
        Arc::new(store.clone()),
        Arc::new(JsonConverter::default()),
        ResultProcessor::<Person>::domain(),
        &RepositoryConfig::default(),
    )
    .unwrap();

    let results: Vec<QueryResult<Person>> =
        query.execute(Parameters::empty()).into_stream().collect().await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().id, "p0");
    assert_eq!(results[1].as_ref().unwrap().id, "p1");
    assert_eq!(results[2].as_ref().unwrap_err().kind(), ErrorKind::Conversion);
    assert_eq!(store.stats().open_cursors(), 0);
}

/// A cursor failure surfaces as a data-access error after the good elements.
#[tokio::test]
async fn test_cursor_failure_mid_stream() {
    let store = people(5);
    store.fail_after(2, StoreError::transport("connection reset"));
    let query = register(
        QueryMethod::builder("all", "people").collection().build().unwrap(),
        &store,
        ResultProcessor::<Person>::domain(),
    );

    let results: Vec<QueryResult<Person>> =
        query.execute(Parameters::empty()).into_stream().collect().await;
    assert_eq!(results.len(), 3);
    assert!(results[2].as_ref().unwrap_err().is_data_access());
}

/// A failed count on a later page fails the page and leaks no cursor.
#[tokio::test]
async fn test_paged_count_failure() {
    let store = people(6);
    store.fail_on(StoreOp::Count, StoreError::command_failed(50, "operation exceeded time limit"));
    let query = register(
        QueryMethod::builder("page", "people").page().build().unwrap(),
        &store,
        ResultProcessor::<Person>::domain(),
    );

    let err = query
        .execute(Parameters::empty().with_page(PageRequest::of(1, 2).unwrap()))
        .into_page()
        .await
        .unwrap_err();
    assert!(err.is_data_access());
    assert_eq!(store.stats().open_cursors(), 0);
}

/// Dropping a later page mid-fetch cancels the fetch and its cursor.
#[tokio::test]
async fn test_paged_drop_mid_fetch_releases_cursor() {
    let store = InMemoryStore::with_batch_size(1);
    store
        .seed(
            "people",
            (0..8).map(|i| json!({"_id": format!("p{}", i), "age": 31 + i})),
        )
        .unwrap();
    let query = register(
        QueryMethod::builder("page", "people").page().build().unwrap(),
        &store,
        ResultProcessor::<Person>::domain(),
    );

    let outcome = query.execute(Parameters::empty().with_page(PageRequest::of(1, 3).unwrap()));
    let mut page = match outcome {
        Outcome::Page(fut) => fut,
        other => panic!("expected a page outcome, got {}", other.kind()),
    };

    assert!((&mut page).now_or_never().is_none());
    assert_eq!(store.stats().commands, 2);
    assert_eq!(store.stats().open_cursors(), 1);

    drop(page);
    assert_eq!(store.stats().open_cursors(), 0);
    assert_eq!(store.stats().cursors_closed, 1);
}

/// A failed lookup in delete mode removes nothing.
#[tokio::test]
async fn test_delete_lookup_failure_removes_nothing() {
    let store = people(3);
    store.fail_on(StoreOp::Find, StoreError::transport("unreachable"));
    let query = register(
        QueryMethod::builder("remove", "people").delete().build().unwrap(),
        &store,
        ResultProcessor::<Person>::domain(),
    );

    let err = query.execute(Parameters::empty()).into_deleted().await.unwrap_err();
    assert!(err.is_data_access());
    assert_eq!(store.documents("people").len(), 3);
}

/// A shape mismatch is reported through the outcome, not a panic.
#[tokio::test]
async fn test_shape_mismatch_is_configuration_error() {
    let store = people(2);
    let query = register(
        QueryMethod::builder("count", "people").count().build().unwrap(),
        &store,
        ResultProcessor::<Value>::domain(),
    );

    let err = query.execute(Parameters::empty()).into_page().await.unwrap_err();
    assert!(err.is_configuration());
}

// =============================================================================
// Meta Tests
// =============================================================================

/// Meta modifiers reach the store on find commands.
#[tokio::test]
async fn test_meta_modifiers_pass_through() {
    let store = people(3);
    let meta = Meta {
        comment: Some("nightly report".into()),
        max_time_ms: Some(250),
        ..Meta::default()
    };
    let query = register(
        QueryMethod::builder("all", "people")
            .collection()
            .meta(meta)
            .build()
            .unwrap(),
        &store,
        ResultProcessor::<Person>::domain(),
    );

    let people: Vec<Person> = query
        .execute(Parameters::empty())
        .into_stream()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(people.len(), 3);
    assert_eq!(
        store.last_modifiers().map(Value::Object),
        Some(json!({"$comment": "nightly report", "$maxTimeMS": 250}))
    );
}

/// Count-mode delete reports the number removed and no entities.
#[tokio::test]
async fn test_count_mode_delete() {
    let store = people(4);
    let query = register(
        QueryMethod::builder("remove", "people")
            .delete()
            .delete_mode(DeleteMode::Count)
            .build()
            .unwrap(),
        &store,
        ResultProcessor::<Person>::domain(),
    );

    let deleted = query.execute(Parameters::empty()).into_deleted().await.unwrap();
    assert_eq!(deleted.deleted_count, 4);
    assert!(deleted.items.is_empty());
    assert_eq!(store.stats().commands, 1);
}
