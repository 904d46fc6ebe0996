//! Repository query methods
//!
//! Registration (`QueryMethod` + `RepositoryQuery::new`) happens once per
//! method; `RepositoryQuery::execute` runs once per call.

mod creator;
mod method;
mod parameters;
mod query;

pub use creator::{QueryCreator, TemplateQuery};
pub use method::{QueryMethod, QueryMethodBuilder, ReturnFlags};
pub use parameters::{ParameterAccessor, Parameters};
pub use query::RepositoryQuery;
