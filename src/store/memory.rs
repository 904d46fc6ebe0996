//! In-memory document store
//!
//! Collections keep insertion order, which is the natural order for
//! unsorted queries. Cursors are opened on first poll and yield in
//! batches, suspending between batches the way a network cursor waits
//! for its next `getMore`.
//!
//! The store counts commands and cursor lifecycles, and can inject
//! failures, so that it doubles as the mock store in tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use futures_util::future::{self, BoxFuture, FutureExt};
use futures_util::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use uuid::Uuid;

use crate::document::{into_document, Document, ID_KEY};
use crate::query::{Criteria, Query};

use super::errors::{StoreError, StoreResult};
use super::filters::CriteriaFilter;
use super::sorter::DocumentSorter;
use super::store::{DocumentStore, StoreOp};

/// Default number of documents per cursor batch
pub const DEFAULT_BATCH_SIZE: usize = 101;

/// Point-in-time copy of the store counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub commands: u64,
    pub cursors_opened: u64,
    pub cursors_closed: u64,
}

impl StatsSnapshot {
    /// Cursors opened but not yet released
    pub fn open_cursors(&self) -> u64 {
        self.cursors_opened.saturating_sub(self.cursors_closed)
    }
}

#[derive(Debug, Default)]
struct StoreStats {
    commands: AtomicU64,
    cursors_opened: AtomicU64,
    cursors_closed: AtomicU64,
}

impl StoreStats {
    /// Closed is read before opened, so a snapshot never shows more
    /// closed cursors than opened ones
    fn snapshot(&self) -> StatsSnapshot {
        let cursors_closed = self.cursors_closed.load(Ordering::SeqCst);
        StatsSnapshot {
            commands: self.commands.load(Ordering::SeqCst),
            cursors_opened: self.cursors_opened.load(Ordering::SeqCst),
            cursors_closed,
        }
    }
}

#[derive(Debug, Clone)]
enum Fault {
    /// Fail the next command of this kind when it is issued
    Command(StoreOp, StoreError),
    /// Fail the next cursor after it has yielded this many documents
    Cursor(usize, StoreError),
}

#[derive(Debug)]
struct Inner {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    stats: Arc<StoreStats>,
    faults: Mutex<Vec<Fault>>,
    last_modifiers: Mutex<Option<Document>>,
    batch_size: usize,
}

impl Inner {
    /// Counts the command and consumes a matching injected fault
    fn issue(&self, op: StoreOp, query: Option<&Query>) -> StoreResult<()> {
        self.stats.commands.fetch_add(1, Ordering::SeqCst);

        if let Some(query) = query {
            query.criteria().validate()?;
            if let Ok(mut last) = self.last_modifiers.lock() {
                *last = query.meta().modifiers();
            }
        }

        let mut faults = self
            .faults
            .lock()
            .map_err(|_| StoreError::transport("fault registry poisoned"))?;
        let position = faults
            .iter()
            .position(|f| matches!(f, Fault::Command(o, _) if *o == op));
        match position.map(|i| faults.remove(i)) {
            Some(Fault::Command(_, err)) => Err(err),
            _ => Ok(()),
        }
    }

    fn take_cursor_fault(&self) -> Option<(usize, StoreError)> {
        let mut faults = self.faults.lock().ok()?;
        let position = faults.iter().position(|f| matches!(f, Fault::Cursor(..)))?;
        match faults.remove(position) {
            Fault::Cursor(after, err) => Some((after, err)),
            Fault::Command(..) => None,
        }
    }

    /// Evaluates a query against a collection snapshot
    fn run(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::transport("store lock poisoned"))?;
        let Some(documents) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let scan_limit = query
            .meta()
            .max_scan
            .map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));

        let mut matched: Vec<Document> = documents
            .iter()
            .take(scan_limit)
            .filter(|doc| CriteriaFilter::matches(doc, query.criteria()))
            .cloned()
            .collect();
        drop(collections);

        DocumentSorter::sort(&mut matched, query.sort());

        let skip = usize::try_from(query.skip_count()).unwrap_or(usize::MAX);
        let limit = query
            .limit_count()
            .map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));

        Ok(matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| match query.projection() {
                Some(projection) => projection.apply(&doc),
                None => doc,
            })
            .collect())
    }

    fn open_cursor(&self, collection: &str, query: &Query) -> StoreResult<Cursor> {
        self.issue(StoreOp::Find, Some(query))?;
        let documents = self.run(collection, query)?;
        let fault = self.take_cursor_fault();

        self.stats.cursors_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Cursor {
            documents: documents.into(),
            yielded: 0,
            batch_size: self.batch_size.max(1),
            fault,
            _guard: CursorGuard {
                stats: Arc::clone(&self.stats),
            },
        })
    }

    fn delete(&self, collection: &str, criteria: &Criteria) -> StoreResult<u64> {
        self.issue(StoreOp::Delete, None)?;
        criteria.validate()?;

        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::transport("store lock poisoned"))?;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let before = documents.len();
        documents.retain(|doc| !CriteriaFilter::matches(doc, criteria));
        Ok((before - documents.len()) as u64)
    }

    fn insert(&self, collection: &str, mut document: Document) -> StoreResult<Value> {
        self.issue(StoreOp::Insert, None)?;

        let id = document
            .entry(ID_KEY.to_string())
            .or_insert_with(|| Value::from(Uuid::new_v4().to_string()))
            .clone();

        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::transport("store lock poisoned"))?;
        let documents = collections.entry(collection.to_string()).or_default();
        if documents.iter().any(|d| d.get(ID_KEY) == Some(&id)) {
            return Err(StoreError::command_failed(
                11000,
                format!("duplicate key {} in {}", id, collection),
            ));
        }
        documents.push(document);
        Ok(id)
    }
}

/// Marks a cursor released when dropped
#[derive(Debug)]
struct CursorGuard {
    stats: Arc<StoreStats>,
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.stats.cursors_closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct Cursor {
    documents: VecDeque<Document>,
    yielded: usize,
    batch_size: usize,
    fault: Option<(usize, StoreError)>,
    _guard: CursorGuard,
}

enum CursorState {
    Pending {
        inner: Arc<Inner>,
        collection: String,
        query: Query,
    },
    Open(Cursor),
    Done,
}

async fn advance(state: CursorState) -> Option<(StoreResult<Document>, CursorState)> {
    match state {
        CursorState::Pending {
            inner,
            collection,
            query,
        } => match inner.open_cursor(&collection, &query) {
            Ok(cursor) => next_document(cursor).await,
            Err(err) => Some((Err(err), CursorState::Done)),
        },
        CursorState::Open(cursor) => next_document(cursor).await,
        CursorState::Done => None,
    }
}

async fn next_document(mut cursor: Cursor) -> Option<(StoreResult<Document>, CursorState)> {
    if cursor.yielded > 0 && cursor.yielded % cursor.batch_size == 0 {
        tokio::task::yield_now().await;
    }

    if let Some((after, _)) = &cursor.fault {
        if cursor.yielded >= *after {
            let err = cursor
                .fault
                .take()
                .map_or(StoreError::CursorClosed, |(_, err)| err);
            return Some((Err(err), CursorState::Done));
        }
    }

    let document = cursor.documents.pop_front()?;
    cursor.yielded += 1;
    Some((Ok(document), CursorState::Open(cursor)))
}

/// Shared, cloneable in-memory store
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_batch_size(DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(HashMap::new()),
                stats: Arc::new(StoreStats::default()),
                faults: Mutex::new(Vec::new()),
                last_modifiers: Mutex::new(None),
                batch_size,
            }),
        }
    }

    /// Inserts documents directly, without counting commands.
    ///
    /// Non-object values are skipped. Missing `_id`s are generated.
    pub fn seed<I>(&self, collection: &str, documents: I) -> StoreResult<usize>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut collections = self
            .inner
            .collections
            .write()
            .map_err(|_| StoreError::transport("store lock poisoned"))?;
        let target = collections.entry(collection.to_string()).or_default();

        let mut inserted = 0;
        for mut document in documents.into_iter().filter_map(into_document) {
            document
                .entry(ID_KEY.to_string())
                .or_insert_with(|| Value::from(Uuid::new_v4().to_string()));
            target.push(document);
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Copy of a collection's documents in natural order
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.inner
            .collections
            .read()
            .ok()
            .and_then(|c| c.get(collection).cloned())
            .unwrap_or_default()
    }

    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .collections
            .read()
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Modifiers sent with the most recent query command
    pub fn last_modifiers(&self) -> Option<Document> {
        self.inner.last_modifiers.lock().ok().and_then(|m| m.clone())
    }

    /// Makes the next command of kind `op` fail with `error`
    pub fn fail_on(&self, op: StoreOp, error: StoreError) {
        if let Ok(mut faults) = self.inner.faults.lock() {
            faults.push(Fault::Command(op, error));
        }
    }

    /// Makes the next cursor fail with `error` after `after` documents
    pub fn fail_after(&self, after: usize, error: StoreError) {
        if let Ok(mut faults) = self.inner.faults.lock() {
            faults.push(Fault::Cursor(after, error));
        }
    }
}

impl DocumentStore for InMemoryStore {
    fn find(&self, collection: &str, query: &Query) -> BoxStream<'static, StoreResult<Document>> {
        let state = CursorState::Pending {
            inner: Arc::clone(&self.inner),
            collection: collection.to_string(),
            query: query.clone(),
        };
        stream::unfold(state, advance).boxed()
    }

    fn find_one(
        &self,
        collection: &str,
        query: &Query,
    ) -> BoxFuture<'static, StoreResult<Option<Document>>> {
        let inner = Arc::clone(&self.inner);
        let collection = collection.to_string();
        let query = query.clone().limit(1);
        future::lazy(move |_| -> StoreResult<Option<Document>> {
            inner.issue(StoreOp::FindOne, Some(&query))?;
            Ok(inner.run(&collection, &query)?.into_iter().next())
        })
        .boxed()
    }

    fn count(&self, collection: &str, query: &Query) -> BoxFuture<'static, StoreResult<u64>> {
        let inner = Arc::clone(&self.inner);
        let collection = collection.to_string();
        let query = query.clone();
        future::lazy(move |_| -> StoreResult<u64> {
            inner.issue(StoreOp::Count, Some(&query))?;
            Ok(inner.run(&collection, &query)?.len() as u64)
        })
        .boxed()
    }

    fn delete(&self, collection: &str, criteria: &Criteria) -> BoxFuture<'static, StoreResult<u64>> {
        let inner = Arc::clone(&self.inner);
        let collection = collection.to_string();
        let criteria = criteria.clone();
        future::lazy(move |_| inner.delete(&collection, &criteria)).boxed()
    }

    fn insert(&self, collection: &str, document: Document) -> BoxFuture<'static, StoreResult<Value>> {
        let inner = Arc::clone(&self.inner);
        let collection = collection.to_string();
        future::lazy(move |_| inner.insert(&collection, document)).boxed()
    }
}
