//! Execution outcomes
//!
//! An `Outcome` is the lazy result of one invocation. Nothing is sent to
//! the store until the contained future or stream is polled, and dropping
//! it cancels whatever is in flight.

use futures_util::future::{self, BoxFuture, FutureExt};
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::Serialize;

use crate::convert::ResultConverter;
use crate::document::Document;
use crate::errors::{QueryError, QueryResult};
use crate::query::{Page, Slice};

/// Result of a delete execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deleted<R> {
    /// Entities removed, empty when only the count was requested
    pub items: Vec<R>,
    pub deleted_count: u64,
}

impl<R> Deleted<R> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            deleted_count: 0,
        }
    }
}

/// Lazy result of a single query invocation
pub enum Outcome<R> {
    Single(BoxFuture<'static, QueryResult<Option<R>>>),
    Many(BoxStream<'static, QueryResult<R>>),
    Page(BoxFuture<'static, QueryResult<Page<R>>>),
    Slice(BoxFuture<'static, QueryResult<Slice<R>>>),
    Count(BoxFuture<'static, QueryResult<u64>>),
    Deleted(BoxFuture<'static, QueryResult<Deleted<R>>>),
}

impl<R> std::fmt::Debug for Outcome<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Outcome::{}", self.kind())
    }
}

fn mismatch(expected: &str, actual: &str) -> QueryError {
    QueryError::configuration(format!("expected {} outcome, got {}", expected, actual))
}

impl<R> Outcome<R> {
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Single(_) => "single",
            Outcome::Many(_) => "many",
            Outcome::Page(_) => "page",
            Outcome::Slice(_) => "slice",
            Outcome::Count(_) => "count",
            Outcome::Deleted(_) => "deleted",
        }
    }
}

impl<R: Send + 'static> Outcome<R> {
    pub async fn into_single(self) -> QueryResult<Option<R>> {
        match self {
            Outcome::Single(fut) => fut.await,
            other => Err(mismatch("single", other.kind())),
        }
    }

    /// Returns the element stream; any other variant yields one error
    pub fn into_stream(self) -> BoxStream<'static, QueryResult<R>> {
        match self {
            Outcome::Many(stream) => stream,
            other => stream::once(future::ready(Err(mismatch("many", other.kind())))).boxed(),
        }
    }

    pub async fn into_page(self) -> QueryResult<Page<R>> {
        match self {
            Outcome::Page(fut) => fut.await,
            other => Err(mismatch("page", other.kind())),
        }
    }

    pub async fn into_slice(self) -> QueryResult<Slice<R>> {
        match self {
            Outcome::Slice(fut) => fut.await,
            other => Err(mismatch("slice", other.kind())),
        }
    }

    pub async fn into_count(self) -> QueryResult<u64> {
        match self {
            Outcome::Count(fut) => fut.await,
            other => Err(mismatch("count", other.kind())),
        }
    }

    pub async fn into_deleted(self) -> QueryResult<Deleted<R>> {
        match self {
            Outcome::Deleted(fut) => fut.await,
            other => Err(mismatch("deleted", other.kind())),
        }
    }
}

/// Ends a stream after its first error, releasing the source immediately
pub(crate) fn end_on_error<R: Send + 'static>(
    source: BoxStream<'static, QueryResult<R>>,
) -> BoxStream<'static, QueryResult<R>> {
    stream::unfold(Some(source), |state| async move {
        let mut source = state?;
        let item = source.next().await?;
        let rest = if item.is_ok() { Some(source) } else { None };
        Some((item, rest))
    })
    .boxed()
}

impl Outcome<Document> {
    /// Applies the per-element conversion to every raw document.
    ///
    /// Cardinality and terminal signals are kept. A conversion failure
    /// ends streams after the elements already delivered.
    pub fn convert<R: Send + 'static>(self, converter: ResultConverter<R>) -> Outcome<R> {
        let one = move |document: Document| converter(document).map_err(QueryError::from);

        match self {
            Outcome::Single(fut) => {
                Outcome::Single(fut.map(move |r| r?.map(one).transpose()).boxed())
            }
            Outcome::Many(source) => {
                let converted = source.map(move |r| r.and_then(&one)).boxed();
                Outcome::Many(end_on_error(converted))
            }
            Outcome::Page(fut) => Outcome::Page(fut.map(move |r| r?.map(&one)).boxed()),
            Outcome::Slice(fut) => Outcome::Slice(fut.map(move |r| r?.map(&one)).boxed()),
            Outcome::Count(fut) => Outcome::Count(fut),
            Outcome::Deleted(fut) => Outcome::Deleted(
                fut.map(move |r| -> QueryResult<Deleted<R>> {
                    let deleted = r?;
                    Ok(Deleted {
                        items: deleted
                            .items
                            .into_iter()
                            .map(&one)
                            .collect::<QueryResult<_>>()?,
                        deleted_count: deleted.deleted_count,
                    })
                })
                .boxed(),
            ),
        }
    }
}
