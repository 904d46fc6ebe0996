//! Query method metadata
//!
//! A `QueryMethod` is the registration-time description of one repository
//! method: its name, target collection, return flags, whether it takes a
//! page request and which cursor meta it carries. The execution
//! descriptor is derived from the flags once and never changes.

use crate::errors::{QueryError, QueryResult};
use crate::execution::{DeleteMode, ExecutionDescriptor, ExecutionShape};
use crate::query::Meta;

/// Return-type flags declared by a query method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReturnFlags {
    pub collection: bool,
    pub page: bool,
    pub slice: bool,
    pub count: bool,
    pub delete: bool,
}

impl ReturnFlags {
    fn conflict(&self) -> Option<&'static str> {
        if self.page && self.slice {
            Some("a method cannot return both a page and a slice")
        } else if self.count && self.delete {
            Some("a method cannot be both a count and a delete")
        } else if self.collection && (self.page || self.slice) {
            Some("a collection method cannot also be paged")
        } else if self.count && (self.collection || self.page || self.slice) {
            Some("a count method returns a single number")
        } else {
            None
        }
    }

    fn shape(&self) -> ExecutionShape {
        if self.delete {
            ExecutionShape::Delete
        } else if self.slice {
            ExecutionShape::Slice
        } else if self.collection {
            ExecutionShape::Collection
        } else if self.page {
            ExecutionShape::Page
        } else if self.count {
            ExecutionShape::CountOnly
        } else {
            ExecutionShape::Single
        }
    }

    /// Flags that produce `shape`
    pub fn for_shape(shape: ExecutionShape) -> Self {
        let mut flags = Self::default();
        match shape {
            ExecutionShape::Single => {}
            ExecutionShape::Collection => flags.collection = true,
            ExecutionShape::Page => flags.page = true,
            ExecutionShape::Slice => flags.slice = true,
            ExecutionShape::Delete => flags.delete = true,
            ExecutionShape::CountOnly => flags.count = true,
        }
        flags
    }
}

/// Registration-time description of a repository query method
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMethod {
    name: String,
    collection: String,
    flags: ReturnFlags,
    descriptor: ExecutionDescriptor,
    pageable: bool,
    meta: Meta,
}

impl QueryMethod {
    pub fn new(
        name: impl Into<String>,
        collection: impl Into<String>,
        flags: ReturnFlags,
        delete_mode: DeleteMode,
        pageable: bool,
        meta: Meta,
    ) -> QueryResult<Self> {
        let name = name.into();
        let collection = collection.into();

        if name.is_empty() {
            return Err(QueryError::configuration("query method name is empty"));
        }
        if collection.is_empty() {
            return Err(QueryError::configuration(format!(
                "query method '{}' has no collection",
                name
            )));
        }
        if let Some(conflict) = flags.conflict() {
            return Err(QueryError::configuration(format!("{}: {}", name, conflict)));
        }

        let descriptor = ExecutionDescriptor::new(flags.shape()).with_delete_mode(delete_mode);

        Ok(Self {
            name,
            collection,
            flags,
            descriptor,
            pageable,
            meta,
        })
    }

    pub fn builder(name: impl Into<String>, collection: impl Into<String>) -> QueryMethodBuilder {
        QueryMethodBuilder {
            name: name.into(),
            collection: collection.into(),
            flags: ReturnFlags::default(),
            delete_mode: DeleteMode::default(),
            pageable: false,
            meta: Meta::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn flags(&self) -> ReturnFlags {
        self.flags
    }

    pub fn descriptor(&self) -> &ExecutionDescriptor {
        &self.descriptor
    }

    pub fn shape(&self) -> ExecutionShape {
        self.descriptor.shape()
    }

    /// Whether the method declares a page request parameter
    pub fn has_pageable(&self) -> bool {
        self.pageable
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn has_meta(&self) -> bool {
        !self.meta.is_empty()
    }
}

/// Fluent construction of a `QueryMethod`
#[derive(Debug, Clone)]
pub struct QueryMethodBuilder {
    name: String,
    collection: String,
    flags: ReturnFlags,
    delete_mode: DeleteMode,
    pageable: bool,
    meta: Meta,
}

impl QueryMethodBuilder {
    pub fn collection(mut self) -> Self {
        self.flags.collection = true;
        self
    }

    pub fn page(mut self) -> Self {
        self.flags.page = true;
        self.pageable = true;
        self
    }

    pub fn slice(mut self) -> Self {
        self.flags.slice = true;
        self.pageable = true;
        self
    }

    pub fn count(mut self) -> Self {
        self.flags.count = true;
        self
    }

    pub fn delete(mut self) -> Self {
        self.flags.delete = true;
        self
    }

    pub fn delete_mode(mut self, mode: DeleteMode) -> Self {
        self.delete_mode = mode;
        self
    }

    /// Sets the declared shape's flag
    pub fn shape(mut self, shape: ExecutionShape) -> Self {
        let flags = ReturnFlags::for_shape(shape);
        self.flags.collection |= flags.collection;
        self.flags.page |= flags.page;
        self.flags.slice |= flags.slice;
        self.flags.count |= flags.count;
        self.flags.delete |= flags.delete;
        self.pageable |= shape.requires_page_request();
        self
    }

    pub fn pageable(mut self, pageable: bool) -> Self {
        self.pageable = pageable;
        self
    }

    pub fn meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    pub fn build(self) -> QueryResult<QueryMethod> {
        QueryMethod::new(
            self.name,
            self.collection,
            self.flags,
            self.delete_mode,
            self.pageable,
            self.meta,
        )
    }
}
