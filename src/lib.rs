//! aerorepo - reactive query execution for document repositories
//!
//! A repository query method is registered once (`QueryMethod`,
//! `RepositoryQuery::new`) and selects one execution strategy. Every call
//! produces a lazy `Outcome` that is resolved against a `DocumentStore`
//! and converted into the method's return type.

pub mod cli;
pub mod config;
pub mod convert;
pub mod document;
pub mod errors;
pub mod execution;
pub mod observability;
pub mod query;
pub mod repository;
pub mod store;

pub use config::RepositoryConfig;
pub use document::Document;
pub use errors::{ErrorKind, QueryError, QueryResult};
pub use execution::{Deleted, Outcome};
pub use repository::{Parameters, QueryMethod, RepositoryQuery};
