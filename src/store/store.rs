//! Document store driver boundary
//!
//! Every command returns a lazy handle: nothing is sent to the store
//! until the future or stream is polled. Dropping a `find` stream
//! releases its cursor.

use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use serde_json::Value;

use crate::document::Document;
use crate::query::{Criteria, Query};

use super::errors::StoreResult;

/// Store commands, used for fault injection and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Find,
    FindOne,
    Count,
    Delete,
    Insert,
}

impl StoreOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOp::Find => "find",
            StoreOp::FindOne => "findOne",
            StoreOp::Count => "count",
            StoreOp::Delete => "delete",
            StoreOp::Insert => "insert",
        }
    }
}

/// Driver for a document store
pub trait DocumentStore: Send + Sync {
    /// Opens a cursor over matching documents, in sort or natural order
    fn find(&self, collection: &str, query: &Query) -> BoxStream<'static, StoreResult<Document>>;

    /// Returns the first matching document
    fn find_one(
        &self,
        collection: &str,
        query: &Query,
    ) -> BoxFuture<'static, StoreResult<Option<Document>>>;

    /// Counts matching documents, honoring skip and limit
    fn count(&self, collection: &str, query: &Query) -> BoxFuture<'static, StoreResult<u64>>;

    /// Deletes matching documents and returns how many were removed
    fn delete(&self, collection: &str, criteria: &Criteria) -> BoxFuture<'static, StoreResult<u64>>;

    /// Inserts a document and returns its `_id`
    fn insert(&self, collection: &str, document: Document) -> BoxFuture<'static, StoreResult<Value>>;
}
