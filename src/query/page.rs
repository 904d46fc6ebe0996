//! Paging types
//!
//! `PageRequest` describes a page window. `Page` carries the content plus
//! the total element count, `Slice` only knows whether more content exists.

use serde::{Deserialize, Serialize};

use crate::errors::{QueryError, QueryResult};

use super::query::Sort;

/// A requested page window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page_number: u64,
    page_size: u64,
    #[serde(default)]
    sort: Sort,
}

impl PageRequest {
    /// Creates a page request. `page_size` must be at least 1.
    pub fn of(page_number: u64, page_size: u64) -> QueryResult<Self> {
        if page_size == 0 {
            return Err(QueryError::configuration("page size must be at least 1"));
        }
        Ok(Self {
            page_number,
            page_size,
            sort: Sort::unsorted(),
        })
    }

    /// First page of the given size
    pub fn first(page_size: u64) -> QueryResult<Self> {
        Self::of(0, page_size)
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn page_number(&self) -> u64 {
        self.page_number
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    /// Number of elements before this page
    pub fn offset(&self) -> u64 {
        self.page_number.saturating_mul(self.page_size)
    }

    pub fn next(&self) -> Self {
        Self {
            page_number: self.page_number.saturating_add(1),
            ..self.clone()
        }
    }

    pub fn previous_or_first(&self) -> Self {
        Self {
            page_number: self.page_number.saturating_sub(1),
            ..self.clone()
        }
    }

    /// Checked after deserialization, since serde bypasses `of`
    pub fn validate(&self) -> QueryResult<()> {
        if self.page_size == 0 {
            return Err(QueryError::configuration("page size must be at least 1"));
        }
        Ok(())
    }
}

/// A page of results with the total element count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<R> {
    pub content: Vec<R>,
    pub page_number: u64,
    pub page_size: u64,
    pub total_elements: u64,
}

impl<R> Page<R> {
    pub fn new(content: Vec<R>, request: &PageRequest, total_elements: u64) -> Self {
        Self {
            content,
            page_number: request.page_number(),
            page_size: request.page_size(),
            total_elements,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_elements.div_ceil(self.page_size)
    }

    pub fn has_next(&self) -> bool {
        self.page_number.saturating_add(1) < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page_number > 0
    }

    pub fn is_first(&self) -> bool {
        !self.has_previous()
    }

    pub fn is_last(&self) -> bool {
        !self.has_next()
    }

    /// Converts the content, keeping page metadata
    pub fn map<T, E>(self, f: impl FnMut(R) -> Result<T, E>) -> Result<Page<T>, E> {
        Ok(Page {
            content: self.content.into_iter().map(f).collect::<Result<_, _>>()?,
            page_number: self.page_number,
            page_size: self.page_size,
            total_elements: self.total_elements,
        })
    }
}

/// A page of results with a has-next flag and no total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice<R> {
    pub content: Vec<R>,
    pub page_number: u64,
    pub page_size: u64,
    pub has_next: bool,
}

impl<R> Slice<R> {
    pub fn new(content: Vec<R>, request: &PageRequest, has_next: bool) -> Self {
        Self {
            content,
            page_number: request.page_number(),
            page_size: request.page_size(),
            has_next,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page_number > 0
    }

    pub fn map<T, E>(self, f: impl FnMut(R) -> Result<T, E>) -> Result<Slice<T>, E> {
        Ok(Slice {
            content: self.content.into_iter().map(f).collect::<Result<_, _>>()?,
            page_number: self.page_number,
            page_size: self.page_size,
            has_next: self.has_next,
        })
    }
}
