//! Document store interface
//!
//! A keyed-collection store: documents are JSON objects addressed by
//! `(collection, id)`. Collections may be nested paths such as
//! `following/{user}/following`. Services only talk to [`DocumentStore`];
//! the SQLite and in-memory backends implement it.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::models::EntityId;
use crate::error::AppError;

/// Document body (the stored JSON object, without its id)
pub type Fields = serde_json::Map<String, Value>;

/// A stored document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    /// Decode into a model, exposing the document id as the `id` field.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, AppError> {
        let mut fields = self.fields;
        fields.insert("id".to_string(), Value::String(self.id));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }
}

/// Encode a model into document fields. The `id` field is dropped: the id
/// lives in the document key.
pub fn encode<T: Serialize>(value: &T) -> Result<Fields, AppError> {
    match serde_json::to_value(value)? {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(AppError::Internal(anyhow::anyhow!(
            "document must encode to a JSON object, got {other}"
        ))),
    }
}

// =============================================================================
// Queries
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `field == value`
    Equals { field: String, value: Value },
    /// `field` is an array containing `value`
    ArrayContains { field: String, value: Value },
}

/// Collection query
///
/// When `order_by` is set, documents without the ordering field are
/// excluded and ties are broken by document id in the same direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
    /// Resume strictly after `(order value, document id)`; requires `order_by`
    pub start_after: Option<(Value, String)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            order_by: None,
            start_after: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Equals {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn array_contains(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::ArrayContains {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn start_after(mut self, value: impl Into<Value>, id: impl Into<String>) -> Self {
        self.start_after = Some((value.into(), id.into()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check that only plain field names are used; backends embed them in
    /// JSON paths.
    pub fn validate(&self) -> Result<(), AppError> {
        let filter_fields = self.filters.iter().map(|filter| match filter {
            Filter::Equals { field, .. } | Filter::ArrayContains { field, .. } => field,
        });
        for field in filter_fields.chain(self.order_by.as_ref().map(|(field, _)| field)) {
            validate_field_name(field)?;
        }
        if self.start_after.is_some() && self.order_by.is_none() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "start_after requires order_by"
            )));
        }
        Ok(())
    }

    /// Whether a document satisfies every filter (ordering and cursor
    /// excluded).
    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters.iter().all(|filter| match filter {
            Filter::Equals { field, value } => {
                fields.get(field).unwrap_or(&Value::Null) == value
            }
            Filter::ArrayContains { field, value } => fields
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
        })
    }
}

pub(crate) fn validate_field_name(field: &str) -> Result<(), AppError> {
    if field.is_empty()
        || !field
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        return Err(AppError::Internal(anyhow::anyhow!(
            "invalid document field name: {field:?}"
        )));
    }
    Ok(())
}

/// Total order over JSON scalars used for `order_by`:
/// null < bool < number < string; arrays and objects compare equal.
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }

    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => rank(left).cmp(&rank(right)),
    }
}

// =============================================================================
// Writes
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Set(Value),
    /// Append each value not already present (set semantics)
    ArrayUnion(Vec<Value>),
}

/// Partial update applied to an existing document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    changes: Vec<(String, FieldChange)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.changes
            .push((field.to_string(), FieldChange::Set(value.into())));
        self
    }

    pub fn array_union(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.changes.push((
            field.to_string(),
            FieldChange::ArrayUnion(vec![value.into()]),
        ));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn apply(&self, fields: &mut Fields) {
        for (field, change) in &self.changes {
            match change {
                FieldChange::Set(value) => {
                    fields.insert(field.clone(), value.clone());
                }
                FieldChange::ArrayUnion(values) => {
                    let entry = fields
                        .entry(field.clone())
                        .or_insert_with(|| Value::Array(Vec::new()));
                    if !entry.is_array() {
                        *entry = Value::Array(Vec::new());
                    }
                    if let Value::Array(items) = entry {
                        for value in values {
                            if !items.contains(value) {
                                items.push(value.clone());
                            }
                        }
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert; fails the whole batch with `Conflict` if the document exists
    Create {
        collection: String,
        id: String,
        fields: Fields,
    },
    /// Insert or replace
    Set {
        collection: String,
        id: String,
        fields: Fields,
    },
    /// Patch; fails the whole batch with `NotFound` if the document is absent
    Update {
        collection: String,
        id: String,
        patch: Patch,
    },
    /// Remove; absent documents are not an error
    Delete { collection: String, id: String },
}

/// Atomic multi-document write: every operation applies or none does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, collection: &str, id: &str, fields: Fields) -> &mut Self {
        self.ops.push(WriteOp::Create {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
        self
    }

    pub fn set(&mut self, collection: &str, id: &str, fields: Fields) -> &mut Self {
        self.ops.push(WriteOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
        self
    }

    pub fn update(&mut self, collection: &str, id: &str, patch: Patch) -> &mut Self {
        self.ops.push(WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            patch,
        });
        self
    }

    pub fn delete(&mut self, collection: &str, id: &str) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }
}

pub(crate) fn already_exists(collection: &str, id: &str) -> AppError {
    AppError::conflict(format!("document {collection}/{id} already exists"))
}

pub(crate) fn missing_document(collection: &str, id: &str) -> AppError {
    AppError::not_found(format!("document {collection}/{id} not found"))
}

// =============================================================================
// Store trait
// =============================================================================

/// Keyed-collection document store
///
/// Single-document writes are atomic on their own; multi-document
/// invariants go through [`DocumentStore::commit`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend name used in logs and metrics
    fn backend(&self) -> &'static str;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError>;

    async fn query(&self, query: &Query) -> Result<Vec<Document>, AppError>;

    async fn commit(&self, batch: WriteBatch) -> Result<(), AppError>;

    async fn count(&self, query: &Query) -> Result<usize, AppError> {
        Ok(self.query(query).await?.len())
    }

    /// Insert with a generated id
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, AppError> {
        let id = EntityId::new().0;
        let mut batch = WriteBatch::new();
        batch.create(collection, &id, fields);
        self.commit(batch).await?;
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<(), AppError> {
        let mut batch = WriteBatch::new();
        batch.set(collection, id, fields);
        self.commit(batch).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Patch) -> Result<(), AppError> {
        let mut batch = WriteBatch::new();
        batch.update(collection, id, patch);
        self.commit(batch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        let mut batch = WriteBatch::new();
        batch.delete(collection, id);
        self.commit(batch).await
    }
}
