//! Execution shapes
//!
//! Every query method has exactly one shape, fixed at registration time.
//! The shape decides which execution strategy runs the method.

use std::fmt;
use std::str::FromStr;

use crate::errors::{QueryError, QueryResult};

/// Result shape of a query method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionShape {
    /// At most one entity
    Single,
    /// A stream of entities
    Collection,
    /// A page with total element count
    Page,
    /// A page with a has-next flag
    Slice,
    /// Deletes matching documents
    Delete,
    /// The number of matching documents
    CountOnly,
}

impl ExecutionShape {
    pub const ALL: [ExecutionShape; 6] = [
        ExecutionShape::Single,
        ExecutionShape::Collection,
        ExecutionShape::Page,
        ExecutionShape::Slice,
        ExecutionShape::Delete,
        ExecutionShape::CountOnly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionShape::Single => "single",
            ExecutionShape::Collection => "collection",
            ExecutionShape::Page => "page",
            ExecutionShape::Slice => "slice",
            ExecutionShape::Delete => "delete",
            ExecutionShape::CountOnly => "count",
        }
    }

    /// Shapes that cannot run without a page request
    pub fn requires_page_request(&self) -> bool {
        matches!(self, ExecutionShape::Page | ExecutionShape::Slice)
    }
}

impl fmt::Display for ExecutionShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExecutionShape {
    type Err = QueryError;

    fn from_str(tag: &str) -> QueryResult<Self> {
        Self::ALL
            .into_iter()
            .find(|shape| shape.as_str() == tag)
            .ok_or_else(|| QueryError::configuration(format!("unknown execution shape '{}'", tag)))
    }
}

/// What a delete method hands back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// The deleted entities, fetched before removal
    #[default]
    Entities,
    /// Only the number of removed documents
    Count,
}

/// Per-method execution metadata, immutable after registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionDescriptor {
    shape: ExecutionShape,
    delete_mode: DeleteMode,
}

impl ExecutionDescriptor {
    pub fn new(shape: ExecutionShape) -> Self {
        Self {
            shape,
            delete_mode: DeleteMode::default(),
        }
    }

    pub fn with_delete_mode(mut self, mode: DeleteMode) -> Self {
        self.delete_mode = mode;
        self
    }

    pub fn shape(&self) -> ExecutionShape {
        self.shape
    }

    pub fn delete_mode(&self) -> DeleteMode {
        self.delete_mode
    }
}
