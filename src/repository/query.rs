//! Repository query execution
//!
//! `RepositoryQuery` is the per-method entry point. Registration validates
//! the method and selects its strategy once. Each `execute` call then
//! creates the query, applies method meta, sort and projection, and hands
//! back the converted lazy outcome.

use std::sync::Arc;

use crate::config::RepositoryConfig;
use crate::convert::{DocumentConverter, ResultConverter, ResultProcessor};
use crate::document::Document;
use crate::errors::{QueryError, QueryResult};
use crate::execution::{ExecutionStrategy, Outcome};
use crate::observability::{log_event, Event};
use crate::query::{Direction, PageRequest, Projection, Query, Sort};
use crate::store::DocumentStore;

use super::creator::QueryCreator;
use super::method::QueryMethod;
use super::parameters::{ParameterAccessor, Parameters};

/// Executable repository query method
pub struct RepositoryQuery<R> {
    method: QueryMethod,
    creator: Arc<dyn QueryCreator>,
    store: Arc<dyn DocumentStore>,
    converter: Arc<dyn DocumentConverter>,
    processor: ResultProcessor<R>,
    strategy: ExecutionStrategy,
    results: ResultConverter<R>,
    max_page_size: u64,
}

impl<R: Send + 'static> RepositoryQuery<R> {
    /// Validates `method` and selects its execution strategy
    pub fn new(
        method: QueryMethod,
        creator: Arc<dyn QueryCreator>,
        store: Arc<dyn DocumentStore>,
        converter: Arc<dyn DocumentConverter>,
        processor: ResultProcessor<R>,
        config: &RepositoryConfig,
    ) -> QueryResult<Self> {
        let placeholder = if method.has_pageable() {
            Some(PageRequest::first(config.default_page_size)?)
        } else {
            None
        };
        let strategy = ExecutionStrategy::select(method.descriptor(), placeholder)
            .map_err(|e| QueryError::configuration(format!("{}: {}", method.name(), message(&e))))?;

        let results = processor.converter(Arc::clone(&converter));

        log_event(
            Event::QueryRegistered,
            &[
                ("method", method.name()),
                ("collection", method.collection()),
                ("strategy", strategy.name()),
            ],
        );

        Ok(Self {
            method,
            creator,
            store,
            converter,
            processor,
            strategy,
            results,
            max_page_size: config.max_page_size,
        })
    }

    pub fn method(&self) -> &QueryMethod {
        &self.method
    }

    pub fn strategy(&self) -> &ExecutionStrategy {
        &self.strategy
    }

    pub fn processor(&self) -> &ResultProcessor<R> {
        &self.processor
    }

    /// Runs the method with `parameters`.
    ///
    /// Returns at once; the store is not contacted until the outcome is
    /// polled. Parameter errors surface through the outcome.
    pub fn execute(&self, parameters: Parameters) -> Outcome<R> {
        let accessor = ParameterAccessor::new(parameters);
        let strategy = self.strategy.with_page(accessor.page().cloned());

        let prepared = self
            .check_page(&strategy)
            .and_then(|_| self.create_query(&accessor));

        let outcome: Outcome<Document> = match prepared {
            Ok(query) => {
                log_event(
                    Event::QueryExecuted,
                    &[
                        ("method", self.method.name()),
                        ("collection", self.method.collection()),
                        ("shape", self.method.shape().as_str()),
                    ],
                );
                strategy.execute(&self.store, &query, self.method.collection())
            }
            Err(err) => {
                let text = err.to_string();
                log_event(
                    Event::QueryFailed,
                    &[
                        ("method", self.method.name()),
                        ("code", err.code()),
                        ("message", text.as_str()),
                    ],
                );
                strategy.fail(err)
            }
        };

        outcome.convert(Arc::clone(&self.results))
    }

    /// Builds the effective query for one invocation
    pub fn create_query(&self, accessor: &ParameterAccessor) -> QueryResult<Query> {
        let mut query = self.creator.create_query(accessor)?;

        if self.method.has_meta() {
            query = query.with_meta(self.method.meta().clone());
        }

        if let Some(sort) = accessor.sort() {
            let extra = self.map_sort(sort);
            let combined = query.sort().clone().and(&extra);
            query = query.with_sort(combined);
        }

        if let Some(fields) = accessor.dynamic_projection() {
            query = query.with_projection(self.map_fields(fields));
        } else if query.projection().is_none() {
            if let Some(fields) = self.processor.returned_type().projection() {
                query = query.with_projection(self.map_fields(fields));
            }
        }

        Ok(query)
    }

    /// Count variant of the invocation's query, meta included
    pub fn create_count_query(&self, accessor: &ParameterAccessor) -> QueryResult<Query> {
        Ok(self.create_query(accessor)?.count_query())
    }

    fn check_page(&self, strategy: &ExecutionStrategy) -> QueryResult<()> {
        match strategy.page() {
            Some(page) if page.page_size() > self.max_page_size => {
                Err(QueryError::configuration(format!(
                    "page size {} exceeds max_page_size {}",
                    page.page_size(),
                    self.max_page_size
                )))
            }
            _ => Ok(()),
        }
    }

    fn map_fields(&self, fields: &[String]) -> Projection {
        Projection::include(fields.iter().map(|f| self.converter.document_key(f)))
    }

    fn map_sort(&self, sort: &Sort) -> Sort {
        sort.orders()
            .iter()
            .fold(Sort::unsorted(), |acc, order| {
                let key = self.converter.document_key(&order.field);
                match order.direction {
                    Direction::Asc => acc.then_asc(key),
                    Direction::Desc => acc.then_desc(key),
                }
            })
    }
}

fn message(err: &QueryError) -> String {
    match err {
        QueryError::Configuration(msg) => msg.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::JsonConverter;
    use crate::execution::ExecutionShape;
    use crate::query::{Criteria, Meta};
    use crate::store::InMemoryStore;
    use futures_util::TryStreamExt;
    use serde::Deserialize;
    use serde_json::{json, Value};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Person {
        id: String,
        age: u32,
    }

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .seed(
                "people",
                [25, 31, 40, 35, 28].iter().enumerate().map(|(i, age)| {
                    json!({"_id": format!("p{}", i + 1), "age": age, "name": format!("n{}", i)})
                }),
            )
            .unwrap();
        store
    }

    fn older_than() -> Arc<dyn QueryCreator> {
        Arc::new(|accessor: &ParameterAccessor| -> QueryResult<Query> {
            let age = accessor.bind(0).cloned().unwrap_or(json!(0));
            Ok(Query::new(Criteria::field("age").gt(age)))
        })
    }

    fn register<R: Send + 'static>(
        method: QueryMethod,
        store: &InMemoryStore,
        processor: ResultProcessor<R>,
    ) -> QueryResult<RepositoryQuery<R>> {
        RepositoryQuery::new(
            method,
            older_than(),
            Arc::new(store.clone()),
            Arc::new(JsonConverter::default()),
            processor,
            &RepositoryConfig::default(),
        )
    }

    #[test]
    fn test_registration_selects_once() {
        let store = store();
        let method = QueryMethod::builder("findOlder", "people").page().build().unwrap();
        let query = register(method, &store, ResultProcessor::<Person>::domain()).unwrap();
        assert_eq!(query.strategy().name(), "paged");
        assert_eq!(query.strategy().page().map(|p| p.page_size()), Some(20));
    }

    #[test]
    fn test_page_without_pageable_fails_registration() {
        let store = store();
        let method = QueryMethod::builder("findOlder", "people")
            .shape(ExecutionShape::Slice)
            .pageable(false)
            .build()
            .unwrap();
        let err = register(method, &store, ResultProcessor::<Person>::domain())
            .err()
            .unwrap();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("findOlder"));
    }

    #[tokio::test]
    async fn test_collection_converts_to_domain_type() {
        let store = store();
        let method = QueryMethod::builder("findOlder", "people").collection().build().unwrap();
        let query = register(method, &store, ResultProcessor::<Person>::domain()).unwrap();

        let people: Vec<Person> = query
            .execute(Parameters::new(vec![json!(30)]).with_sort(Sort::asc("age")))
            .into_stream()
            .try_collect()
            .await
            .unwrap();
        let ages: Vec<u32> = people.iter().map(|p| p.age).collect();
        assert_eq!(ages, vec![31, 35, 40]);
    }

    #[tokio::test]
    async fn test_meta_is_applied() {
        let store = store();
        let meta = Meta {
            comment: Some("audit".into()),
            ..Meta::default()
        };
        let method = QueryMethod::builder("countOlder", "people")
            .count()
            .meta(meta)
            .build()
            .unwrap();
        let query = register(method, &store, ResultProcessor::<Value>::domain()).unwrap();

        let count = query.execute(Parameters::new(vec![json!(30)])).into_count().await.unwrap();
        assert_eq!(count, 3);
        assert_eq!(
            store.last_modifiers().map(Value::Object),
            Some(json!({"$comment": "audit"}))
        );
    }

    #[tokio::test]
    async fn test_oversized_page_fails_lazily() {
        let store = store();
        let method = QueryMethod::builder("findOlder", "people").page().build().unwrap();
        let query = register(method, &store, ResultProcessor::<Value>::domain()).unwrap();

        let outcome = query.execute(Parameters::empty().with_page(PageRequest::first(5000).unwrap()));
        assert_eq!(store.stats().commands, 0);
        assert!(outcome.into_page().await.unwrap_err().is_configuration());
        assert_eq!(store.stats().commands, 0);
    }

    #[test]
    fn test_projection_from_processor_and_dynamic_override() {
        #[derive(Debug, Deserialize)]
        struct AgeOnly {
            #[allow(dead_code)]
            age: u32,
        }

        let store = store();
        let method = QueryMethod::builder("findOlder", "people").collection().build().unwrap();
        let processor = ResultProcessor::<AgeOnly>::projecting::<Person, _, _>(["id", "age"]);
        let query = register(method, &store, processor).unwrap();

        let accessor = ParameterAccessor::new(Parameters::empty());
        let created = query.create_query(&accessor).unwrap();
        let fields = created.projection().map(|p| p.fields().to_vec());
        assert_eq!(fields, Some(vec!["_id".to_string(), "age".to_string()]));

        let accessor = ParameterAccessor::new(Parameters::empty().with_projection(["name"]));
        let created = query.create_query(&accessor).unwrap();
        let fields = created.projection().map(|p| p.fields().to_vec());
        assert_eq!(fields, Some(vec!["name".to_string()]));
    }

    #[test]
    fn test_count_query_keeps_meta_only() {
        let store = store();
        let method = QueryMethod::builder("findOlder", "people")
            .collection()
            .meta(Meta {
                hint: Some("age_1".into()),
                ..Meta::default()
            })
            .build()
            .unwrap();
        let query = register(method, &store, ResultProcessor::<Value>::domain()).unwrap();

        let accessor = ParameterAccessor::new(
            Parameters::new(vec![json!(30)]).with_sort(Sort::desc("age")),
        );
        let count = query.create_count_query(&accessor).unwrap();
        assert!(!count.sort().is_sorted());
        assert_eq!(count.meta().hint.as_deref(), Some("age_1"));
        assert_eq!(count.criteria(), &Criteria::field("age").gt(json!(30)));
    }
}
