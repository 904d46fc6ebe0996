//! Execution strategies
//!
//! A strategy turns a `Query` into a lazy `Outcome<Document>` against a
//! `DocumentStore`. It is selected once per method from the method's
//! `ExecutionDescriptor` and then shared by every invocation.
//!
//! No strategy touches the store before its outcome is polled.

use std::sync::Arc;

use futures_util::future::{self, FutureExt};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;

use crate::document::{Document, ID_KEY};
use crate::errors::{QueryError, QueryResult};
use crate::observability::{log_event, Event};
use crate::query::{Criteria, Page, PageRequest, Query, Slice};
use crate::store::{DocumentStore, StoreError};

use super::outcome::{end_on_error, Deleted, Outcome};
use super::shape::{DeleteMode, ExecutionDescriptor, ExecutionShape};

/// Closed set of execution strategies
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionStrategy {
    /// `find_one`, or `count` when `count_only`
    SingleEntity { count_only: bool },
    /// Streams every match, windowed when a page is given
    Collection { page: Option<PageRequest> },
    /// One page plus the total match count
    Paged { page: PageRequest },
    /// One page plus a has-next flag, without counting
    Sliced { page: PageRequest },
    /// Removes matches
    Delete { mode: DeleteMode },
}

fn page_required(shape: ExecutionShape) -> QueryError {
    QueryError::configuration(format!(
        "{} methods need a pageable parameter",
        shape.as_str()
    ))
}

impl ExecutionStrategy {
    /// Picks the strategy for a method.
    ///
    /// Checked in order: delete, slice, collection, page, single.
    pub fn select(
        descriptor: &ExecutionDescriptor,
        page: Option<PageRequest>,
    ) -> QueryResult<Self> {
        let shape = descriptor.shape();
        match shape {
            ExecutionShape::Delete => Ok(ExecutionStrategy::Delete {
                mode: descriptor.delete_mode(),
            }),
            ExecutionShape::Slice => page
                .map(|page| ExecutionStrategy::Sliced { page })
                .ok_or_else(|| page_required(shape)),
            ExecutionShape::Collection => Ok(ExecutionStrategy::Collection { page }),
            ExecutionShape::Page => page
                .map(|page| ExecutionStrategy::Paged { page })
                .ok_or_else(|| page_required(shape)),
            ExecutionShape::Single => Ok(ExecutionStrategy::SingleEntity { count_only: false }),
            ExecutionShape::CountOnly => Ok(ExecutionStrategy::SingleEntity { count_only: true }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExecutionStrategy::SingleEntity { count_only: false } => "single",
            ExecutionStrategy::SingleEntity { count_only: true } => "count",
            ExecutionStrategy::Collection { .. } => "collection",
            ExecutionStrategy::Paged { .. } => "paged",
            ExecutionStrategy::Sliced { .. } => "slice",
            ExecutionStrategy::Delete { mode: DeleteMode::Entities } => "delete",
            ExecutionStrategy::Delete { mode: DeleteMode::Count } => "delete-count",
        }
    }

    pub fn page(&self) -> Option<&PageRequest> {
        match self {
            ExecutionStrategy::Collection { page } => page.as_ref(),
            ExecutionStrategy::Paged { page } | ExecutionStrategy::Sliced { page } => Some(page),
            _ => None,
        }
    }

    /// Binds an invocation's page request.
    ///
    /// Collection windows only when a page is given. Paged and sliced
    /// strategies keep their registered page when none is given.
    pub fn with_page(&self, request: Option<PageRequest>) -> Self {
        match (self, request) {
            (ExecutionStrategy::Collection { .. }, page) => ExecutionStrategy::Collection { page },
            (ExecutionStrategy::Paged { .. }, Some(page)) => ExecutionStrategy::Paged { page },
            (ExecutionStrategy::Sliced { .. }, Some(page)) => ExecutionStrategy::Sliced { page },
            (strategy, _) => strategy.clone(),
        }
    }

    /// Outcome of this strategy's shape that fails with `error` when polled
    pub fn fail(&self, error: QueryError) -> Outcome<Document> {
        match self {
            ExecutionStrategy::SingleEntity { count_only: false } => {
                Outcome::Single(future::ready(Err(error)).boxed())
            }
            ExecutionStrategy::SingleEntity { count_only: true } => {
                Outcome::Count(future::ready(Err(error)).boxed())
            }
            ExecutionStrategy::Collection { .. } => {
                Outcome::Many(stream::once(future::ready(Err(error))).boxed())
            }
            ExecutionStrategy::Paged { .. } => Outcome::Page(future::ready(Err(error)).boxed()),
            ExecutionStrategy::Sliced { .. } => Outcome::Slice(future::ready(Err(error)).boxed()),
            ExecutionStrategy::Delete { .. } => {
                Outcome::Deleted(future::ready(Err(error)).boxed())
            }
        }
    }

    /// Builds the lazy outcome of running `query` against `collection`
    pub fn execute(
        &self,
        store: &Arc<dyn DocumentStore>,
        query: &Query,
        collection: &str,
    ) -> Outcome<Document> {
        let store = Arc::clone(store);
        let query = query.clone();
        let collection = collection.to_string();

        match self {
            ExecutionStrategy::SingleEntity { count_only: false } => {
                Outcome::Single(find_single(store, query, collection).boxed())
            }
            ExecutionStrategy::SingleEntity { count_only: true } => {
                Outcome::Count(count_matching(store, query, collection).boxed())
            }
            ExecutionStrategy::Collection { page } => {
                let query = match page {
                    Some(page) => query.with_page(page),
                    None => query,
                };
                stream_all(store, query, collection)
            }
            ExecutionStrategy::Paged { page } => {
                Outcome::Page(fetch_page(store, query, collection, page.clone()).boxed())
            }
            ExecutionStrategy::Sliced { page } => {
                Outcome::Slice(fetch_slice(store, query, collection, page.clone()).boxed())
            }
            ExecutionStrategy::Delete { mode: DeleteMode::Entities } => {
                Outcome::Deleted(delete_entities(store, query, collection).boxed())
            }
            ExecutionStrategy::Delete { mode: DeleteMode::Count } => {
                Outcome::Deleted(delete_counting(store, query, collection).boxed())
            }
        }
    }
}

async fn find_single(
    store: Arc<dyn DocumentStore>,
    query: Query,
    collection: String,
) -> QueryResult<Option<Document>> {
    Ok(store.find_one(&collection, &query).await?)
}

async fn count_matching(
    store: Arc<dyn DocumentStore>,
    query: Query,
    collection: String,
) -> QueryResult<u64> {
    Ok(store.count(&collection, &query).await?)
}

fn stream_all(store: Arc<dyn DocumentStore>, query: Query, collection: String) -> Outcome<Document> {
    let limit = query
        .limit_count()
        .map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));

    let cursor = stream::once(future::lazy(move |_| store.find(&collection, &query)))
        .flatten()
        .err_into::<QueryError>()
        .take(limit)
        .boxed();

    Outcome::Many(end_on_error(cursor))
}

async fn fetch_page(
    store: Arc<dyn DocumentStore>,
    query: Query,
    collection: String,
    page: PageRequest,
) -> QueryResult<Page<Document>> {
    let window = query.clone().with_page(&page);
    let fetch = store.find(&collection, &window).try_collect::<Vec<Document>>();

    if page.offset() == 0 {
        let content = fetch.await?;
        if content.is_empty() {
            log_event(Event::PageCountSkipped, &[("collection", collection.as_str())]);
            return Ok(Page::new(content, &page, 0));
        }
        let total = store.count(&collection, &query.count_query()).await?;
        return Ok(Page::new(content, &page, total));
    }

    let count = store.count(&collection, &query.count_query());
    let (content, total) = future::try_join(fetch, count).await?;
    Ok(Page::new(content, &page, total))
}

async fn fetch_slice(
    store: Arc<dyn DocumentStore>,
    query: Query,
    collection: String,
    page: PageRequest,
) -> QueryResult<Slice<Document>> {
    let size = page.page_size();
    let window = query.with_page(&page).limit(size.saturating_add(1));

    let mut content: Vec<Document> = store.find(&collection, &window).try_collect().await?;
    let has_next = content.len() as u64 > size;
    content.truncate(usize::try_from(size).unwrap_or(usize::MAX));
    Ok(Slice::new(content, &page, has_next))
}

async fn delete_entities(
    store: Arc<dyn DocumentStore>,
    query: Query,
    collection: String,
) -> QueryResult<Deleted<Document>> {
    let matched: Vec<Document> = store
        .find(&collection, &query.clone().without_projection())
        .try_collect()
        .await?;
    if matched.is_empty() {
        return Ok(Deleted::empty());
    }

    // every fetched document must be deletable by id, or none is deleted
    let ids: Vec<Value> = matched
        .iter()
        .map(|doc| {
            doc.get(ID_KEY)
                .cloned()
                .ok_or_else(|| StoreError::missing_id(collection.as_str()))
        })
        .collect::<Result<_, _>>()?;
    let exact = query.criteria().clone().and(Criteria::field(ID_KEY).one_of(ids));
    let deleted_count = store.delete(&collection, &exact).await?;

    Ok(Deleted {
        items: matched,
        deleted_count,
    })
}

async fn delete_counting(
    store: Arc<dyn DocumentStore>,
    query: Query,
    collection: String,
) -> QueryResult<Deleted<Document>> {
    let deleted_count = store.delete(&collection, query.criteria()).await?;
    Ok(Deleted {
        items: Vec::new(),
        deleted_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Projection, Sort};
    use crate::store::{InMemoryStore, StoreOp};
    use serde_json::json;

    fn people(n: u64) -> (InMemoryStore, Arc<dyn DocumentStore>) {
        let store = InMemoryStore::with_batch_size(3);
        store
            .seed(
                "people",
                (1..=n).map(|i| json!({"_id": format!("p{}", i), "age": 20 + i})),
            )
            .unwrap();
        let shared: Arc<dyn DocumentStore> = Arc::new(store.clone());
        (store, shared)
    }

    fn select(shape: ExecutionShape, page: Option<PageRequest>) -> ExecutionStrategy {
        ExecutionStrategy::select(&ExecutionDescriptor::new(shape), page).unwrap()
    }

    #[test]
    fn test_select_covers_every_shape() {
        let page = PageRequest::first(5).ok();
        assert_eq!(select(ExecutionShape::Single, None).name(), "single");
        assert_eq!(select(ExecutionShape::CountOnly, None).name(), "count");
        assert_eq!(select(ExecutionShape::Collection, None).name(), "collection");
        assert_eq!(select(ExecutionShape::Page, page.clone()).name(), "paged");
        assert_eq!(select(ExecutionShape::Slice, page).name(), "slice");
        assert_eq!(select(ExecutionShape::Delete, None).name(), "delete");
    }

    #[test]
    fn test_select_page_without_pageable_fails() {
        for shape in [ExecutionShape::Page, ExecutionShape::Slice] {
            let err = ExecutionStrategy::select(&ExecutionDescriptor::new(shape), None).unwrap_err();
            assert!(err.is_configuration());
        }
    }

    #[test]
    fn test_delete_wins_regardless_of_page() {
        let descriptor =
            ExecutionDescriptor::new(ExecutionShape::Delete).with_delete_mode(DeleteMode::Count);
        let strategy = ExecutionStrategy::select(&descriptor, PageRequest::first(2).ok()).unwrap();
        assert_eq!(strategy, ExecutionStrategy::Delete { mode: DeleteMode::Count });
    }

    #[test]
    fn test_with_page_rebinding() {
        let registered = PageRequest::first(10).unwrap();
        let requested = PageRequest::of(2, 10).unwrap();

        let paged = ExecutionStrategy::Paged { page: registered.clone() };
        assert_eq!(paged.with_page(None).page(), Some(&registered));
        assert_eq!(paged.with_page(Some(requested.clone())).page(), Some(&requested));

        let collection = ExecutionStrategy::Collection { page: Some(registered) };
        assert_eq!(collection.with_page(None).page(), None);
    }

    #[tokio::test]
    async fn test_execute_is_lazy() {
        let (store, shared) = people(5);
        let page = PageRequest::of(1, 2).ok();
        for strategy in [
            select(ExecutionShape::Single, None),
            select(ExecutionShape::Collection, None),
            select(ExecutionShape::Page, page.clone()),
            select(ExecutionShape::Slice, page),
            select(ExecutionShape::Delete, None),
        ] {
            let outcome = strategy.execute(&shared, &Query::all(), "people");
            drop(outcome);
        }
        assert_eq!(store.stats().commands, 0);
    }

    #[tokio::test]
    async fn test_single_returns_first_in_sort_order() {
        let (_, shared) = people(4);
        let query = Query::all().with_sort(Sort::desc("age"));
        let found = select(ExecutionShape::Single, None)
            .execute(&shared, &query, "people")
            .into_single()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found["_id"], "p4");
    }

    #[tokio::test]
    async fn test_collection_honors_limit() {
        let (_, shared) = people(10);
        let docs: Vec<Document> = select(ExecutionShape::Collection, None)
            .execute(&shared, &Query::all().limit(4), "people")
            .into_stream()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(docs.len(), 4);
    }

    #[tokio::test]
    async fn test_first_page_empty_skips_count() {
        let (store, shared) = people(0);
        let page = select(ExecutionShape::Page, PageRequest::first(5).ok())
            .execute(&shared, &Query::all(), "people")
            .into_page()
            .await
            .unwrap();
        assert!(page.content.is_empty());
        assert_eq!(page.total_elements, 0);
        assert_eq!(store.stats().commands, 1);
    }

    #[tokio::test]
    async fn test_later_page_counts_concurrently() {
        let (store, shared) = people(7);
        let page = select(ExecutionShape::Page, PageRequest::of(1, 3).ok())
            .execute(&shared, &Query::all(), "people")
            .into_page()
            .await
            .unwrap();
        assert_eq!(page.content.len(), 3);
        assert_eq!(page.total_elements, 7);
        assert_eq!(page.total_pages(), 3);
        assert_eq!(store.stats().commands, 2);
    }

    #[tokio::test]
    async fn test_slice_fetches_one_extra() {
        let (store, shared) = people(4);
        let slice = select(ExecutionShape::Slice, PageRequest::first(3).ok())
            .execute(&shared, &Query::all(), "people")
            .into_slice()
            .await
            .unwrap();
        assert_eq!(slice.content.len(), 3);
        assert!(slice.has_next);
        assert_eq!(store.stats().commands, 1);
    }

    #[tokio::test]
    async fn test_delete_entities_removes_fetched_set() {
        let (store, shared) = people(5);
        let query = Query::new(Criteria::field("age").gt(json!(23)));
        let deleted = select(ExecutionShape::Delete, None)
            .execute(&shared, &query, "people")
            .into_deleted()
            .await
            .unwrap();
        assert_eq!(deleted.deleted_count, 2);
        let ids: Vec<&Value> = deleted.items.iter().map(|d| &d["_id"]).collect();
        assert_eq!(ids, vec!["p4", "p5"]);
        assert_eq!(store.documents("people").len(), 3);
    }

    #[tokio::test]
    async fn test_delete_without_matches_issues_no_delete() {
        let (store, shared) = people(2);
        let query = Query::new(Criteria::field("age").gt(json!(99)));
        let deleted = select(ExecutionShape::Delete, None)
            .execute(&shared, &query, "people")
            .into_deleted()
            .await
            .unwrap();
        assert_eq!(deleted, Deleted::empty());
        assert_eq!(store.stats().commands, 1);
    }

    /// Serves documents from an in-memory store with `_id` removed
    struct IdlessStore(InMemoryStore);

    impl DocumentStore for IdlessStore {
        fn find(
            &self,
            collection: &str,
            query: &Query,
        ) -> futures_util::stream::BoxStream<'static, crate::store::StoreResult<Document>> {
            self.0
                .find(collection, query)
                .map_ok(|mut doc| {
                    doc.remove(ID_KEY);
                    doc
                })
                .boxed()
        }

        fn find_one(
            &self,
            collection: &str,
            query: &Query,
        ) -> futures_util::future::BoxFuture<'static, crate::store::StoreResult<Option<Document>>>
        {
            self.0.find_one(collection, query)
        }

        fn count(
            &self,
            collection: &str,
            query: &Query,
        ) -> futures_util::future::BoxFuture<'static, crate::store::StoreResult<u64>> {
            self.0.count(collection, query)
        }

        fn delete(
            &self,
            collection: &str,
            criteria: &Criteria,
        ) -> futures_util::future::BoxFuture<'static, crate::store::StoreResult<u64>> {
            self.0.delete(collection, criteria)
        }

        fn insert(
            &self,
            collection: &str,
            document: Document,
        ) -> futures_util::future::BoxFuture<'static, crate::store::StoreResult<Value>> {
            self.0.insert(collection, document)
        }
    }

    #[tokio::test]
    async fn test_delete_rejects_documents_without_id() {
        let (store, _) = people(3);
        let shared: Arc<dyn DocumentStore> = Arc::new(IdlessStore(store.clone()));

        let err = select(ExecutionShape::Delete, None)
            .execute(&shared, &Query::all(), "people")
            .into_deleted()
            .await
            .unwrap_err();
        assert!(err.is_data_access());
        assert!(err.to_string().contains("_id"));
        assert_eq!(store.documents("people").len(), 3);
        assert_eq!(store.stats().commands, 1);
    }

    #[tokio::test]
    async fn test_delete_count_mode() {
        let (store, shared) = people(3);
        let strategy = ExecutionStrategy::Delete { mode: DeleteMode::Count };
        let deleted = strategy
            .execute(&shared, &Query::all(), "people")
            .into_deleted()
            .await
            .unwrap();
        assert!(deleted.items.is_empty());
        assert_eq!(deleted.deleted_count, 3);
        assert!(store.documents("people").is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_data_access() {
        let (store, shared) = people(3);
        store.fail_on(StoreOp::FindOne, StoreError::transport("reset"));
        let err = select(ExecutionShape::Single, None)
            .execute(&shared, &Query::all(), "people")
            .into_single()
            .await
            .unwrap_err();
        assert!(err.is_data_access());
    }

    #[tokio::test]
    async fn test_fail_matches_strategy_shape() {
        let strategy = select(ExecutionShape::CountOnly, None);
        let outcome = strategy.fail(QueryError::configuration("page too large"));
        assert_eq!(outcome.kind(), "count");
        assert!(outcome.into_count().await.unwrap_err().is_configuration());
    }

    #[tokio::test]
    async fn test_raw_documents_keep_projection() {
        let (_, shared) = people(1);
        let query = Query::all().with_projection(Projection::include(["age"]).without_id());
        let doc = select(ExecutionShape::Single, None)
            .execute(&shared, &query, "people")
            .into_single()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(Value::Object(doc), json!({"age": 21}));
    }
}
