//! Query creation
//!
//! A `QueryCreator` builds the `Query` for one invocation from its
//! parameters. Closures implement it directly; `TemplateQuery` covers
//! string-declared queries with positional `?N` placeholders.

use serde_json::{Map, Value};

use crate::errors::{QueryError, QueryResult};
use crate::query::{Criteria, Projection, Query, Sort};

use super::parameters::ParameterAccessor;

/// Builds the query for one invocation
pub trait QueryCreator: Send + Sync {
    fn create_query(&self, accessor: &ParameterAccessor) -> QueryResult<Query>;
}

impl<F> QueryCreator for F
where
    F: Fn(&ParameterAccessor) -> QueryResult<Query> + Send + Sync,
{
    fn create_query(&self, accessor: &ParameterAccessor) -> QueryResult<Query> {
        self(accessor)
    }
}

/// Filter document template, e.g. `{"age": {"$gt": "?0"}}`.
///
/// A string value of exactly `?N` is replaced by bind parameter `N`.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateQuery {
    filter: Value,
    sort: Sort,
    fields: Option<Vec<String>>,
}

impl TemplateQuery {
    /// Checks the template shape up front; binding happens per invocation
    pub fn new(filter: Value) -> QueryResult<Self> {
        if !filter.is_object() {
            return Err(QueryError::configuration(format!(
                "query template must be a JSON object, got {}",
                filter
            )));
        }
        Criteria::from_document(&filter)
            .map_err(|e| QueryError::configuration(format!("invalid query template: {}", e)))?;

        Ok(Self {
            filter,
            sort: Sort::unsorted(),
            fields: None,
        })
    }

    pub fn parse(template: &str) -> QueryResult<Self> {
        let filter = serde_json::from_str(template)
            .map_err(|e| QueryError::configuration(format!("query template is not JSON: {}", e)))?;
        Self::new(filter)
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn filter(&self) -> &Value {
        &self.filter
    }
}

fn placeholder(value: &str) -> Option<usize> {
    value.strip_prefix('?')?.parse().ok()
}

fn bind(template: &Value, accessor: &ParameterAccessor) -> QueryResult<Value> {
    match template {
        Value::String(s) => match placeholder(s) {
            Some(index) => accessor.bind(index).cloned().ok_or_else(|| {
                QueryError::configuration(format!(
                    "placeholder ?{} has no parameter ({} given)",
                    index,
                    accessor.values().len()
                ))
            }),
            None => Ok(template.clone()),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| bind(item, accessor))
            .collect::<QueryResult<Vec<_>>>()
            .map(Value::Array),
        Value::Object(fields) => {
            let mut bound = Map::new();
            for (key, value) in fields {
                bound.insert(key.clone(), bind(value, accessor)?);
            }
            Ok(Value::Object(bound))
        }
        other => Ok(other.clone()),
    }
}

impl QueryCreator for TemplateQuery {
    fn create_query(&self, accessor: &ParameterAccessor) -> QueryResult<Query> {
        let filter = bind(&self.filter, accessor)?;
        let criteria = Criteria::from_document(&filter)
            .map_err(|e| QueryError::configuration(format!("invalid bound query: {}", e)))?;

        let mut query = Query::new(criteria).with_sort(self.sort.clone());
        if let Some(fields) = &self.fields {
            query = query.with_projection(Projection::include(fields.iter().cloned()));
        }
        Ok(query)
    }
}
