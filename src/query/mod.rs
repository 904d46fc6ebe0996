//! Query model
//!
//! Criteria, projection, sort, skip, limit and cursor meta, plus the
//! paging types built on top of them.

mod criteria;
mod page;
mod query;

pub use criteria::{Criteria, FieldCriteria, FilterOp};
pub use page::{Page, PageRequest, Slice};
pub use query::{Direction, Meta, Order, Projection, Query, Sort};
