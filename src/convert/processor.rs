//! Result processing
//!
//! A `ResultProcessor` knows the returned shape of a query method (the
//! domain type itself, or a projection over it) and converts entity
//! values into that shape. Combined with a `DocumentConverter` it yields
//! the per-element conversion function applied to every strategy output.

use std::any::type_name;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::document::{get_path, into_document, set_path, Document};

use super::converter::DocumentConverter;
use super::errors::{ConversionError, ConversionResult};

/// Per-element conversion from a raw document to the returned value
pub type ResultConverter<R> = Arc<dyn Fn(Document) -> ConversionResult<R> + Send + Sync>;

type EntityFn<R> = Arc<dyn Fn(Value) -> ConversionResult<R> + Send + Sync>;

/// Describes what a query method hands back to its caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnedType {
    domain_type: &'static str,
    returned_type: &'static str,
    projection: Option<Vec<String>>,
}

impl ReturnedType {
    pub fn domain_type(&self) -> &'static str {
        self.domain_type
    }

    pub fn returned_type(&self) -> &'static str {
        self.returned_type
    }

    /// Entity properties read by the returned type, when it projects
    pub fn projection(&self) -> Option<&[String]> {
        self.projection.as_deref()
    }

    pub fn is_projecting(&self) -> bool {
        self.projection.is_some()
    }
}

/// Converts entity values into the method's returned type
pub struct ResultProcessor<R> {
    returned_type: ReturnedType,
    convert: EntityFn<R>,
}

impl<R> Clone for ResultProcessor<R> {
    fn clone(&self) -> Self {
        Self {
            returned_type: self.returned_type.clone(),
            convert: Arc::clone(&self.convert),
        }
    }
}

impl<R> std::fmt::Debug for ResultProcessor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultProcessor")
            .field("returned_type", &self.returned_type)
            .finish()
    }
}

impl<T> ResultProcessor<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Returns entities as the domain type itself
    pub fn domain() -> Self {
        Self {
            returned_type: ReturnedType {
                domain_type: type_name::<T>(),
                returned_type: type_name::<T>(),
                projection: None,
            },
            convert: Arc::new(|entity: Value| {
                serde_json::from_value(entity)
                    .map_err(|e| ConversionError::deserialize(type_name::<T>(), e))
            }),
        }
    }

    /// Returns a projection `T` over domain type `D`, reading only `fields`
    pub fn projecting<D, I, S>(fields: I) -> Self
    where
        D: ?Sized + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();

        Self {
            returned_type: ReturnedType {
                domain_type: type_name::<D>(),
                returned_type: type_name::<T>(),
                projection: Some(fields.clone()),
            },
            convert: projection_fn::<D, T>(fields),
        }
    }
}

fn projection_fn<D, T>(fields: Vec<String>) -> EntityFn<T>
where
    D: ?Sized + 'static,
    T: DeserializeOwned + Send + 'static,
{
    Arc::new(move |entity: Value| {
        let source = into_document(entity)
            .ok_or_else(|| ConversionError::NotADocument(type_name::<D>().to_string()))?;
        let mut projected = Document::new();
        for field in &fields {
            if let Some(value) = get_path(&source, field) {
                set_path(&mut projected, field, value.clone());
            }
        }
        serde_json::from_value(Value::Object(projected))
            .map_err(|e| ConversionError::deserialize(type_name::<T>(), e))
    })
}

impl<R: 'static> ResultProcessor<R> {
    pub fn returned_type(&self) -> &ReturnedType {
        &self.returned_type
    }

    /// Converts one entity value
    pub fn convert(&self, entity: Value) -> ConversionResult<R> {
        (self.convert)(entity)
    }

    /// Post-processes every converted value with `f`
    pub fn map<U, F>(self, f: F) -> ResultProcessor<U>
    where
        U: 'static,
        F: Fn(R) -> U + Send + Sync + 'static,
    {
        let inner = self.convert;
        let returned_type = ReturnedType {
            returned_type: type_name::<U>(),
            ..self.returned_type
        };
        ResultProcessor {
            returned_type,
            convert: Arc::new(move |entity: Value| inner(entity).map(&f)),
        }
    }

    /// Composes the document converter with this processor:
    /// `Document -> entity -> R`
    pub fn converter(&self, documents: Arc<dyn DocumentConverter>) -> ResultConverter<R> {
        let convert = Arc::clone(&self.convert);
        Arc::new(move |document: Document| {
            let entity = documents.to_entity(document)?;
            convert(entity)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::JsonConverter;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Person {
        id: String,
        name: String,
        age: u32,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct NameOnly {
        name: String,
    }

    fn doc(value: Value) -> Document {
        into_document(value).unwrap()
    }

    #[test]
    fn test_domain_processor() {
        let processor = ResultProcessor::<Person>::domain();
        assert!(!processor.returned_type().is_projecting());

        let convert = processor.converter(Arc::new(JsonConverter::default()));
        let person = convert(doc(json!({"_id": "p1", "name": "A", "age": 3}))).unwrap();
        assert_eq!(person.id, "p1");
    }

    #[test]
    fn test_projecting_processor() {
        let processor = ResultProcessor::<NameOnly>::projecting::<Person, _, _>(["name"]);
        let returned = processor.returned_type();
        assert!(returned.is_projecting());
        assert!(returned.domain_type().ends_with("Person"));
        assert!(returned.returned_type().ends_with("NameOnly"));
        assert_eq!(returned.projection(), Some(&["name".to_string()][..]));

        let convert = processor.converter(Arc::new(JsonConverter::default()));
        let name = convert(doc(json!({"_id": "p1", "name": "A", "age": 3}))).unwrap();
        assert_eq!(name, NameOnly { name: "A".into() });
    }

    #[test]
    fn test_map_post_processes() {
        let processor = ResultProcessor::<Person>::domain().map(|p| p.age * 2);
        let convert = processor.converter(Arc::new(JsonConverter::default()));
        let doubled = convert(doc(json!({"_id": "p1", "name": "A", "age": 21}))).unwrap();
        assert_eq!(doubled, 42);
    }

    #[test]
    fn test_conversion_failure() {
        let convert = ResultProcessor::<Person>::domain().converter(Arc::new(JsonConverter::default()));
        let err = convert(doc(json!({"_id": "p1", "name": "A"}))).unwrap_err();
        assert!(matches!(err, ConversionError::Deserialize { .. }));
    }
}
