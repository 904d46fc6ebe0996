//! Query model
//!
//! A `Query` is an immutable description of what to fetch: criteria,
//! projection, sort, skip, limit and cursor meta. Builder methods consume
//! the query and return a modified copy.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::{get_path, set_path, Document, ID_KEY};

use super::criteria::Criteria;
use super::page::PageRequest;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }

    /// Numeric form used in sort documents
    pub fn as_i32(&self) -> i32 {
        match self {
            Direction::Asc => 1,
            Direction::Desc => -1,
        }
    }
}

/// A single sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub field: String,
    pub direction: Direction,
}

/// Ordered list of sort keys
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::unsorted().then_asc(field)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::unsorted().then_desc(field)
    }

    pub fn then_asc(self, field: impl Into<String>) -> Self {
        self.then(field, Direction::Asc)
    }

    pub fn then_desc(self, field: impl Into<String>) -> Self {
        self.then(field, Direction::Desc)
    }

    fn then(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.orders.push(Order {
            field: field.into(),
            direction,
        });
        self
    }

    /// Appends `other`'s keys, skipping fields already sorted on
    pub fn and(mut self, other: &Sort) -> Self {
        for order in &other.orders {
            if !self.orders.iter().any(|o| o.field == order.field) {
                self.orders.push(order.clone());
            }
        }
        self
    }

    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Renders as a sort document: `{"age": -1, "name": 1}`
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        for order in &self.orders {
            doc.insert(order.field.clone(), Value::from(order.direction.as_i32()));
        }
        Value::Object(doc)
    }
}

/// Field inclusion set
///
/// `_id` is returned unless explicitly excluded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Projection {
    fields: Vec<String>,
    exclude_id: bool,
}

impl Projection {
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut projection = Self::default();
        for field in fields {
            let field = field.into();
            if !projection.fields.contains(&field) {
                projection.fields.push(field);
            }
        }
        projection
    }

    pub fn without_id(mut self) -> Self {
        self.exclude_id = true;
        self
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Narrows a document to the included fields
    pub fn apply(&self, document: &Document) -> Document {
        let mut projected = Document::new();

        if !self.exclude_id {
            if let Some(id) = document.get(ID_KEY) {
                projected.insert(ID_KEY.to_string(), id.clone());
            }
        }

        for field in &self.fields {
            if field == ID_KEY && self.exclude_id {
                continue;
            }
            if let Some(value) = get_path(document, field) {
                set_path(&mut projected, field, value.clone());
            }
        }

        projected
    }

    /// Renders as a fields document: `{"name": 1, "_id": 0}`
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        for field in &self.fields {
            doc.insert(field.clone(), Value::from(1));
        }
        if self.exclude_id {
            doc.insert(ID_KEY.to_string(), Value::from(0));
        }
        Value::Object(doc)
    }
}

/// Cursor meta attributes passed through to the store
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub max_time_ms: Option<u64>,
    #[serde(default)]
    pub max_scan: Option<u64>,
    #[serde(default)]
    pub snapshot: bool,
}

impl Meta {
    pub fn is_empty(&self) -> bool {
        self.hint.is_none()
            && self.comment.is_none()
            && self.max_time_ms.is_none()
            && self.max_scan.is_none()
            && !self.snapshot
    }

    /// Builds the cursor modifiers document.
    ///
    /// Returns `None` for empty meta so that no modifiers are sent.
    pub fn modifiers(&self) -> Option<Document> {
        if self.is_empty() {
            return None;
        }

        let mut modifiers = Document::new();
        if let Some(hint) = &self.hint {
            modifiers.insert("$hint".to_string(), Value::from(hint.as_str()));
        }
        if let Some(comment) = &self.comment {
            modifiers.insert("$comment".to_string(), Value::from(comment.as_str()));
        }
        if let Some(ms) = self.max_time_ms {
            modifiers.insert("$maxTimeMS".to_string(), Value::from(ms));
        }
        if let Some(scan) = self.max_scan {
            modifiers.insert("$maxScan".to_string(), Value::from(scan));
        }
        if self.snapshot {
            modifiers.insert("$snapshot".to_string(), Value::from(true));
        }
        Some(modifiers)
    }
}

/// Immutable query description
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    criteria: Criteria,
    projection: Option<Projection>,
    sort: Sort,
    skip: u64,
    limit: Option<u64>,
    meta: Meta,
}

impl Query {
    pub fn new(criteria: Criteria) -> Self {
        Self {
            criteria,
            ..Self::default()
        }
    }

    /// Query matching every document
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn without_projection(mut self) -> Self {
        self.projection = None;
        self
    }

    /// Replaces the sort with `sort`
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.meta.hint = Some(hint.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.meta.comment = Some(comment.into());
        self
    }

    pub fn max_time_ms(mut self, ms: u64) -> Self {
        self.meta.max_time_ms = Some(ms);
        self
    }

    pub fn max_scan(mut self, scan: u64) -> Self {
        self.meta.max_scan = Some(scan);
        self
    }

    pub fn use_snapshot(mut self) -> Self {
        self.meta.snapshot = true;
        self
    }

    /// Applies a page window: skip/limit from the page, sort appended
    pub fn with_page(mut self, page: &PageRequest) -> Self {
        self.skip = page.offset();
        self.limit = Some(page.page_size());
        self.sort = self.sort.and(page.sort());
        self
    }

    /// Count variant: same criteria and meta, no projection, sort or window
    pub fn count_query(&self) -> Self {
        Self {
            criteria: self.criteria.clone(),
            meta: self.meta.clone(),
            ..Self::default()
        }
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    pub fn skip_count(&self) -> u64 {
        self.skip
    }

    pub fn limit_count(&self) -> Option<u64> {
        self.limit
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Renders the full query as a JSON description
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("filter".to_string(), self.criteria.to_document());
        if let Some(projection) = &self.projection {
            doc.insert("fields".to_string(), projection.to_document());
        }
        if self.sort.is_sorted() {
            doc.insert("sort".to_string(), self.sort.to_document());
        }
        if self.skip > 0 {
            doc.insert("skip".to_string(), Value::from(self.skip));
        }
        if let Some(limit) = self.limit {
            doc.insert("limit".to_string(), Value::from(limit));
        }
        if let Some(modifiers) = self.meta.modifiers() {
            doc.insert("modifiers".to_string(), Value::Object(modifiers));
        }
        Value::Object(doc)
    }
}
