//! Document sorting for the in-memory store
//!
//! Sorting is stable, so documents with equal keys keep insertion order.

use std::cmp::Ordering;

use serde_json::Value;

use crate::document::{get_path, Document};
use crate::query::{Direction, Sort};

/// Sorts documents by a multi-key sort
pub struct DocumentSorter;

impl DocumentSorter {
    pub fn sort(documents: &mut [Document], sort: &Sort) {
        if !sort.is_sorted() {
            return;
        }

        documents.sort_by(|a, b| {
            for order in sort.orders() {
                let ordering =
                    Self::compare_values(get_path(a, &order.field), get_path(b, &order.field));
                let ordering = match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    /// Compares two JSON values.
    ///
    /// Missing < null < bool < number < string < array < object.
    fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        let (a, b) = match (a, b) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a), Some(b)) => (a, b),
        };

        let type_order = |v: &Value| -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Number(_) => 2,
                Value::String(_) => 3,
                Value::Array(_) => 4,
                Value::Object(_) => 5,
            }
        };

        match (a, b) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => {
                if let (Some(xi), Some(yi)) = (x.as_i64(), y.as_i64()) {
                    return xi.cmp(&yi);
                }
                let xf = x.as_f64().unwrap_or(0.0);
                let yf = y.as_f64().unwrap_or(0.0);
                xf.partial_cmp(&yf).unwrap_or(Ordering::Equal)
            }
            (Value::String(x), Value::String(y)) => x.cmp(y),
            _ => type_order(a).cmp(&type_order(b)),
        }
    }
}
