//! CLI query requests
//!
//! A request names a collection, a result shape and a filter template,
//! plus optional bind parameters, sort, fields, window, page and meta:
//!
//! ```json
//! {"collection": "people", "shape": "page", "filter": {"age": {"$gt": "?0"}},
//!  "params": [30], "sort": [{"field": "age", "direction": "desc"}],
//!  "page": {"number": 0, "size": 10}, "meta": {"comment": "cli"}}
//! ```

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::config::RepositoryConfig;
use crate::convert::{JsonConverter, ResultProcessor};
use crate::errors::{QueryError, QueryResult};
use crate::execution::{DeleteMode, ExecutionShape, ExecutionStrategy};
use crate::query::{Meta, PageRequest, Query, Sort};
use crate::repository::{
    ParameterAccessor, Parameters, QueryCreator, QueryMethod, RepositoryQuery, TemplateQuery,
};
use crate::store::DocumentStore;

use super::errors::{CliError, CliResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageSpec {
    #[serde(default)]
    pub number: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryRequest {
    pub collection: String,
    #[serde(default = "default_shape")]
    pub shape: String,
    #[serde(default = "default_filter")]
    pub filter: Value,
    #[serde(default)]
    pub params: Vec<Value>,
    #[serde(default)]
    pub sort: Option<Sort>,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub skip: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub page: Option<PageSpec>,
    #[serde(default)]
    pub meta: Meta,
    /// `"entities"` (default) or `"count"`
    #[serde(default)]
    pub delete_mode: Option<String>,
}

fn default_shape() -> String {
    "collection".to_string()
}

fn default_filter() -> Value {
    Value::Object(Map::new())
}

impl QueryRequest {
    pub fn from_value(value: Value) -> CliResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| CliError::invalid_request(format!("Invalid query request: {}", e)))
    }

    pub fn shape(&self) -> QueryResult<ExecutionShape> {
        self.shape.parse()
    }

    fn delete_mode(&self) -> QueryResult<DeleteMode> {
        match self.delete_mode.as_deref() {
            None | Some("entities") => Ok(DeleteMode::Entities),
            Some("count") => Ok(DeleteMode::Count),
            Some(other) => Err(QueryError::configuration(format!(
                "unknown delete_mode '{}'",
                other
            ))),
        }
    }

    fn page_request(&self) -> QueryResult<Option<PageRequest>> {
        self.page
            .as_ref()
            .map(|p| PageRequest::of(p.number, p.size))
            .transpose()
    }

    fn method(&self) -> QueryResult<QueryMethod> {
        let shape = self.shape()?;
        QueryMethod::builder(format!("cli.{}", shape), self.collection.clone())
            .shape(shape)
            .pageable(self.page.is_some() || shape.requires_page_request())
            .delete_mode(self.delete_mode()?)
            .meta(self.meta.clone())
            .build()
    }

    fn creator(&self) -> QueryResult<Arc<dyn QueryCreator>> {
        let mut template = TemplateQuery::new(self.filter.clone())?;
        if let Some(fields) = &self.fields {
            template = template.with_fields(fields.iter().cloned());
        }
        let (skip, limit) = (self.skip, self.limit);

        Ok(Arc::new(move |accessor: &ParameterAccessor| -> QueryResult<Query> {
            let mut query = template.create_query(accessor)?;
            if let Some(skip) = skip {
                query = query.skip(skip);
            }
            if let Some(limit) = limit {
                query = query.limit(limit);
            }
            Ok(query)
        }))
    }

    pub fn parameters(&self) -> QueryResult<Parameters> {
        let mut parameters = Parameters::new(self.params.clone());
        if let Some(page) = self.page_request()? {
            parameters = parameters.with_page(page);
        }
        if let Some(sort) = &self.sort {
            parameters = parameters.with_sort(sort.clone());
        }
        Ok(parameters)
    }

    /// Registers the request as an untyped repository query
    pub fn register(
        &self,
        config: &RepositoryConfig,
        store: Arc<dyn DocumentStore>,
    ) -> QueryResult<RepositoryQuery<Value>> {
        RepositoryQuery::new(
            self.method()?,
            self.creator()?,
            store,
            Arc::new(JsonConverter::new(config.id_property.clone())),
            ResultProcessor::<Value>::domain(),
            config,
        )
    }
}

/// Describes what running `request` would do
pub fn explain(query: &RepositoryQuery<Value>, parameters: Parameters) -> QueryResult<Value> {
    let accessor = ParameterAccessor::new(parameters);
    let strategy = query.strategy().with_page(accessor.page().cloned());
    let created = query.create_query(&accessor)?;

    let effective = match &strategy {
        ExecutionStrategy::Sliced { page } => {
            created.clone().with_page(page).limit(page.page_size().saturating_add(1))
        }
        other => match other.page() {
            Some(page) => created.clone().with_page(page),
            None => created.clone(),
        },
    };

    let mut plan = json!({
        "method": query.method().name(),
        "collection": query.method().collection(),
        "shape": query.method().shape().as_str(),
        "strategy": strategy.name(),
        "query": effective.to_document(),
        "modifiers": effective.meta().modifiers().map(Value::Object),
    });
    if let (ExecutionStrategy::Paged { .. }, Some(obj)) = (&strategy, plan.as_object_mut()) {
        obj.insert(
            "count_query".to_string(),
            query.create_count_query(&accessor)?.to_document(),
        );
    }
    Ok(plan)
}
