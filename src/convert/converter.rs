//! Document conversion
//!
//! A `DocumentConverter` maps between store documents and entity values.
//! Entities are untyped JSON at this seam; the typed helpers `read` and
//! `write` sit on top via serde.

use std::any::type_name;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::document::{Document, ID_KEY};

use super::errors::{ConversionError, ConversionResult};

/// Converts between store documents and entity values
pub trait DocumentConverter: Send + Sync {
    /// Maps an entity value to a storable document
    fn to_document(&self, entity: &Value) -> ConversionResult<Document>;

    /// Maps a stored document to an entity value
    fn to_entity(&self, document: Document) -> ConversionResult<Value>;

    /// Document key that stores the given entity property
    fn document_key(&self, property: &str) -> String {
        property.to_string()
    }
}

/// Reads a typed entity from a stored document
pub fn read<T: DeserializeOwned>(
    converter: &dyn DocumentConverter,
    document: Document,
) -> ConversionResult<T> {
    let entity = converter.to_entity(document)?;
    serde_json::from_value(entity).map_err(|e| ConversionError::deserialize(type_name::<T>(), e))
}

/// Writes a typed entity as a storable document
pub fn write<T: Serialize>(
    converter: &dyn DocumentConverter,
    entity: &T,
) -> ConversionResult<Document> {
    let value = serde_json::to_value(entity)
        .map_err(|e| ConversionError::deserialize(type_name::<T>(), e))?;
    converter.to_document(&value)
}

/// serde_json based converter.
///
/// The store's `_id` key is exposed to entities under `id_property`.
#[derive(Debug, Clone)]
pub struct JsonConverter {
    id_property: String,
}

impl Default for JsonConverter {
    fn default() -> Self {
        Self::new("id")
    }
}

impl JsonConverter {
    pub fn new(id_property: impl Into<String>) -> Self {
        Self {
            id_property: id_property.into(),
        }
    }

    pub fn id_property(&self) -> &str {
        &self.id_property
    }

    fn renames_id(&self) -> bool {
        self.id_property != ID_KEY
    }
}

impl DocumentConverter for JsonConverter {
    fn to_document(&self, entity: &Value) -> ConversionResult<Document> {
        let mut document = entity
            .as_object()
            .cloned()
            .ok_or_else(|| ConversionError::NotADocument(entity.to_string()))?;

        if self.renames_id() {
            if let Some(id) = document.remove(&self.id_property) {
                if !id.is_null() {
                    document.insert(ID_KEY.to_string(), id);
                }
            }
        }
        Ok(document)
    }

    fn to_entity(&self, mut document: Document) -> ConversionResult<Value> {
        if self.renames_id() {
            if let Some(id) = document.remove(ID_KEY) {
                document.insert(self.id_property.clone(), id);
            }
        }
        Ok(Value::Object(document))
    }

    fn document_key(&self, property: &str) -> String {
        if property == self.id_property {
            ID_KEY.to_string()
        } else {
            property.to_string()
        }
    }
}
