//! Invocation parameters

use serde_json::Value;

use crate::query::{PageRequest, Sort};

/// Arguments of one query method invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    values: Vec<Value>,
    page: Option<PageRequest>,
    sort: Option<Sort>,
    projection: Option<Vec<String>>,
}

impl Parameters {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Narrows the returned fields for this invocation only
    pub fn with_projection<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// Read access to invocation parameters
#[derive(Debug, Clone)]
pub struct ParameterAccessor {
    parameters: Parameters,
}

impl ParameterAccessor {
    pub fn new(parameters: Parameters) -> Self {
        Self { parameters }
    }

    /// Bind value at `index`
    pub fn bind(&self, index: usize) -> Option<&Value> {
        self.parameters.values.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.parameters.values
    }

    pub fn page(&self) -> Option<&PageRequest> {
        self.parameters.page.as_ref()
    }

    pub fn sort(&self) -> Option<&Sort> {
        self.parameters.sort.as_ref()
    }

    pub fn dynamic_projection(&self) -> Option<&[String]> {
        self.parameters.projection.as_deref()
    }
}
