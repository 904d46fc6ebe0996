//! Document store boundary
//!
//! The `DocumentStore` trait is the driver seam. `InMemoryStore` is the
//! bundled implementation, used by the CLI and as the mock store in tests.

mod errors;
mod filters;
mod memory;
mod sorter;
mod store;

pub use errors::{StoreError, StoreResult};
pub use filters::CriteriaFilter;
pub use memory::{InMemoryStore, StatsSnapshot, DEFAULT_BATCH_SIZE};
pub use sorter::DocumentSorter;
pub use store::{DocumentStore, StoreOp};
