//! Filter criteria
//!
//! A criteria tree selects documents. It is built fluently and travels
//! to the store either as a tree or as a Mongo-style filter document:
//!
//! ```ignore
//! let c = Criteria::field("age").gt(json!(30)).and(Criteria::field("active").is(json!(true)));
//! assert_eq!(c.to_document(), json!({"$and": [{"age": {"$gt": 30}}, {"active": true}]}));
//! ```

use serde_json::{Map, Value};

use crate::store::{StoreError, StoreResult};

/// Comparison applied to a single field
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
}

impl FilterOp {
    /// Returns the operator key used in filter documents
    pub fn op_name(&self) -> &'static str {
        match self {
            FilterOp::Eq(_) => "$eq",
            FilterOp::Ne(_) => "$ne",
            FilterOp::Gt(_) => "$gt",
            FilterOp::Gte(_) => "$gte",
            FilterOp::Lt(_) => "$lt",
            FilterOp::Lte(_) => "$lte",
            FilterOp::In(_) => "$in",
            FilterOp::Nin(_) => "$nin",
            FilterOp::Exists(_) => "$exists",
        }
    }

    fn operand(&self) -> Value {
        match self {
            FilterOp::Eq(v)
            | FilterOp::Ne(v)
            | FilterOp::Gt(v)
            | FilterOp::Gte(v)
            | FilterOp::Lt(v)
            | FilterOp::Lte(v) => v.clone(),
            FilterOp::In(vs) | FilterOp::Nin(vs) => Value::Array(vs.clone()),
            FilterOp::Exists(b) => Value::Bool(*b),
        }
    }

    fn parse(op: &str, operand: &Value) -> StoreResult<Self> {
        let list = |v: &Value| -> StoreResult<Vec<Value>> {
            v.as_array()
                .cloned()
                .ok_or_else(|| StoreError::malformed(format!("{} expects an array", op)))
        };

        Ok(match op {
            "$eq" => FilterOp::Eq(operand.clone()),
            "$ne" => FilterOp::Ne(operand.clone()),
            "$gt" => FilterOp::Gt(operand.clone()),
            "$gte" => FilterOp::Gte(operand.clone()),
            "$lt" => FilterOp::Lt(operand.clone()),
            "$lte" => FilterOp::Lte(operand.clone()),
            "$in" => FilterOp::In(list(operand)?),
            "$nin" => FilterOp::Nin(list(operand)?),
            "$exists" => FilterOp::Exists(
                operand
                    .as_bool()
                    .ok_or_else(|| StoreError::malformed("$exists expects a boolean"))?,
            ),
            other => return Err(StoreError::malformed(format!("unknown operator {}", other))),
        })
    }
}

/// A filter expression tree
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Criteria {
    /// Matches every document
    #[default]
    All,
    /// A single field comparison
    Field { field: String, op: FilterOp },
    And(Vec<Criteria>),
    Or(Vec<Criteria>),
    Not(Box<Criteria>),
}

/// Builder returned by [`Criteria::field`]
#[derive(Debug, Clone)]
pub struct FieldCriteria {
    field: String,
}

impl FieldCriteria {
    fn op(self, op: FilterOp) -> Criteria {
        Criteria::Field {
            field: self.field,
            op,
        }
    }

    pub fn is(self, value: Value) -> Criteria {
        self.op(FilterOp::Eq(value))
    }

    pub fn ne(self, value: Value) -> Criteria {
        self.op(FilterOp::Ne(value))
    }

    pub fn gt(self, value: Value) -> Criteria {
        self.op(FilterOp::Gt(value))
    }

    pub fn gte(self, value: Value) -> Criteria {
        self.op(FilterOp::Gte(value))
    }

    pub fn lt(self, value: Value) -> Criteria {
        self.op(FilterOp::Lt(value))
    }

    pub fn lte(self, value: Value) -> Criteria {
        self.op(FilterOp::Lte(value))
    }

    pub fn one_of(self, values: Vec<Value>) -> Criteria {
        self.op(FilterOp::In(values))
    }

    pub fn none_of(self, values: Vec<Value>) -> Criteria {
        self.op(FilterOp::Nin(values))
    }

    pub fn exists(self, present: bool) -> Criteria {
        self.op(FilterOp::Exists(present))
    }
}

impl Criteria {
    /// Start a comparison on `field`
    pub fn field(field: impl Into<String>) -> FieldCriteria {
        FieldCriteria {
            field: field.into(),
        }
    }

    /// Conjunction, flattening nested `And` and dropping `All`
    pub fn and(self, other: Criteria) -> Criteria {
        match (self, other) {
            (Criteria::All, c) | (c, Criteria::All) => c,
            (Criteria::And(mut a), Criteria::And(b)) => {
                a.extend(b);
                Criteria::And(a)
            }
            (Criteria::And(mut a), c) => {
                a.push(c);
                Criteria::And(a)
            }
            (c, Criteria::And(mut b)) => {
                b.insert(0, c);
                Criteria::And(b)
            }
            (a, b) => Criteria::And(vec![a, b]),
        }
    }

    /// Disjunction, flattening nested `Or`
    pub fn or(self, other: Criteria) -> Criteria {
        match (self, other) {
            (Criteria::Or(mut a), Criteria::Or(b)) => {
                a.extend(b);
                Criteria::Or(a)
            }
            (Criteria::Or(mut a), c) => {
                a.push(c);
                Criteria::Or(a)
            }
            (a, b) => Criteria::Or(vec![a, b]),
        }
    }

    /// Negation
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Criteria {
        Criteria::Not(Box::new(self))
    }

    /// Returns true if this criteria matches everything
    pub fn is_all(&self) -> bool {
        matches!(self, Criteria::All)
    }

    /// Checks structural validity without evaluating anything
    pub fn validate(&self) -> StoreResult<()> {
        match self {
            Criteria::All => Ok(()),
            Criteria::Field { field, .. } => {
                if field.is_empty() {
                    return Err(StoreError::malformed("empty field name"));
                }
                if field.starts_with('$') {
                    return Err(StoreError::malformed(format!(
                        "field name may not start with '$': {}",
                        field
                    )));
                }
                if field.split('.').any(str::is_empty) {
                    return Err(StoreError::malformed(format!("bad field path: {}", field)));
                }
                Ok(())
            }
            Criteria::And(items) | Criteria::Or(items) => {
                if items.is_empty() {
                    return Err(StoreError::malformed("empty logical clause"));
                }
                items.iter().try_for_each(Criteria::validate)
            }
            Criteria::Not(inner) => inner.validate(),
        }
    }

    /// Renders the criteria as a filter document
    pub fn to_document(&self) -> Value {
        match self {
            Criteria::All => Value::Object(Map::new()),
            Criteria::Field { field, op } => {
                let mut doc = Map::new();
                let rendered = match op {
                    // Plain values keep the short form; objects would read as operators
                    FilterOp::Eq(v) if !v.is_object() => v.clone(),
                    _ => {
                        let mut inner = Map::new();
                        inner.insert(op.op_name().to_string(), op.operand());
                        Value::Object(inner)
                    }
                };
                doc.insert(field.clone(), rendered);
                Value::Object(doc)
            }
            Criteria::And(items) => Self::logical("$and", items),
            Criteria::Or(items) => Self::logical("$or", items),
            Criteria::Not(inner) => Self::logical("$nor", std::slice::from_ref(inner.as_ref())),
        }
    }

    fn logical(key: &str, items: &[Criteria]) -> Value {
        let mut doc = Map::new();
        doc.insert(
            key.to_string(),
            Value::Array(items.iter().map(Criteria::to_document).collect()),
        );
        Value::Object(doc)
    }

    /// Parses a filter document into a criteria tree
    pub fn from_document(value: &Value) -> StoreResult<Criteria> {
        let doc = value
            .as_object()
            .ok_or_else(|| StoreError::malformed("filter must be a document"))?;

        let mut clauses = Vec::new();
        for (key, operand) in doc {
            clauses.push(Self::parse_clause(key, operand)?);
        }

        Ok(match clauses.len() {
            0 => Criteria::All,
            1 => clauses.remove(0),
            _ => Criteria::And(clauses),
        })
    }

    fn parse_clause(key: &str, operand: &Value) -> StoreResult<Criteria> {
        match key {
            "$and" | "$or" | "$nor" => {
                let items = operand
                    .as_array()
                    .ok_or_else(|| StoreError::malformed(format!("{} expects an array", key)))?
                    .iter()
                    .map(Criteria::from_document)
                    .collect::<StoreResult<Vec<_>>>()?;
                Ok(match key {
                    "$and" => Criteria::And(items),
                    "$or" => Criteria::Or(items),
                    _ => Criteria::Not(Box::new(Criteria::Or(items))),
                })
            }
            k if k.starts_with('$') => {
                Err(StoreError::malformed(format!("unknown top-level operator {}", k)))
            }
            field => match operand {
                Value::Object(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => {
                    let mut parsed = ops
                        .iter()
                        .map(|(op, v)| {
                            FilterOp::parse(op, v).map(|op| Criteria::Field {
                                field: field.to_string(),
                                op,
                            })
                        })
                        .collect::<StoreResult<Vec<_>>>()?;
                    Ok(if parsed.len() == 1 {
                        parsed.remove(0)
                    } else {
                        Criteria::And(parsed)
                    })
                }
                v => Ok(Criteria::Field {
                    field: field.to_string(),
                    op: FilterOp::Eq(v.clone()),
                }),
            },
        }
    }
}
