//! Store-level document representation
//!
//! Documents are JSON objects. Field paths use dot notation
//! (`address.city`) to reach into embedded documents.

use serde_json::{Map, Value};

/// A raw document as stored and returned by a document store
pub type Document = Map<String, Value>;

/// Name of the identifier key every stored document carries
pub const ID_KEY: &str = "_id";

/// Resolves a dotted field path against a document.
///
/// Returns `None` when any segment is missing or a non-object is
/// traversed.
pub fn get_path<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = document.get(first)?;

    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }

    Some(current)
}

/// Writes `value` at a dotted field path, creating intermediate objects.
///
/// An existing non-object value on the path is replaced.
pub fn set_path(document: &mut Document, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            document.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = document
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(inner) = entry {
                set_path(inner, rest, value);
            }
        }
    }
}

/// Converts a JSON value into a document, rejecting non-objects
pub fn into_document(value: Value) -> Option<Document> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
