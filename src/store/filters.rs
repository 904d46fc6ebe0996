//! Criteria evaluation for the in-memory store
//!
//! Documents are matched strictly:
//! - no type coercion (`"123"` never equals `123`)
//! - numbers compare numerically, strings lexicographically
//! - a missing or null field fails every comparison except `$ne`, `$nin`
//!   and `$exists: false`

use std::cmp::Ordering;

use serde_json::Value;

use crate::document::{get_path, Document};
use crate::query::{Criteria, FilterOp};

/// Evaluates criteria trees against documents
pub struct CriteriaFilter;

impl CriteriaFilter {
    /// Checks if a document matches the criteria
    pub fn matches(document: &Document, criteria: &Criteria) -> bool {
        match criteria {
            Criteria::All => true,
            Criteria::Field { field, op } => Self::matches_field(document, field, op),
            Criteria::And(items) => items.iter().all(|c| Self::matches(document, c)),
            Criteria::Or(items) => items.iter().any(|c| Self::matches(document, c)),
            Criteria::Not(inner) => !Self::matches(document, inner),
        }
    }

    fn matches_field(document: &Document, field: &str, op: &FilterOp) -> bool {
        let value = get_path(document, field).filter(|v| !v.is_null());

        match (op, value) {
            (FilterOp::Exists(expected), v) => v.is_some() == *expected,
            (FilterOp::Ne(expected), v) => v != Some(expected),
            (FilterOp::Nin(values), v) => v.map_or(true, |v| !values.contains(v)),
            (_, None) => false,
            (FilterOp::Eq(expected), Some(v)) => v == expected,
            (FilterOp::In(values), Some(v)) => values.contains(v),
            (FilterOp::Gt(bound), Some(v)) => Self::compare(v, bound) == Some(Ordering::Greater),
            (FilterOp::Gte(bound), Some(v)) => matches!(
                Self::compare(v, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            (FilterOp::Lt(bound), Some(v)) => Self::compare(v, bound) == Some(Ordering::Less),
            (FilterOp::Lte(bound), Some(v)) => matches!(
                Self::compare(v, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }

    /// Orders two values of the same comparable type; `None` across types
    fn compare(actual: &Value, bound: &Value) -> Option<Ordering> {
        match (actual, bound) {
            (Value::Number(a), Value::Number(b)) => {
                if let (Some(ai), Some(bi)) = (a.as_i64(), b.as_i64()) {
                    return Some(ai.cmp(&bi));
                }
                a.as_f64()?.partial_cmp(&b.as_f64()?)
            }
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}
