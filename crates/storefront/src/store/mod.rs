//! Document store abstraction.
//!
//! The storefront persists orders, profiles and admin notifications as JSON
//! documents grouped into named collections. [`DocumentStore`] is the seam:
//! production uses [`FirestoreStore`] over the Firestore REST API, tests use
//! [`MemoryStore`].
//!
//! Field paths are dotted (`invoice.id`) and address nested maps.

mod codec;
mod firestore;
mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::firebase::CredentialError;

/// Errors from document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The target document does not exist.
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    /// HTTP transport failed.
    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with an error status.
    #[error("store API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Obtaining an access token failed.
    #[error("store authentication failed: {0}")]
    Auth(#[from] CredentialError),

    /// A document could not be encoded or decoded.
    #[error("document codec error: {0}")]
    Codec(String),

    /// A stored document did not have the expected shape.
    #[error("malformed document: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A document together with its id.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    /// Always a JSON object.
    pub data: Value,
}

/// A single-field mutation applied by [`DocumentStore::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Replace the value at the path.
    Set(Value),
    /// Append each element not already present in the array at the path.
    ArrayUnion(Vec<Value>),
}

/// Comparison used by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Equal,
    GreaterOrEqual,
}

/// A field predicate. Documents lacking the field never match.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

/// Sort direction for [`Query::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A collection query: conjunctive filters, optional ordering and limit.
///
/// ```rust
/// # use kaalika_storefront::store::{Direction, Query};
/// let query = Query::new()
///     .where_eq("seen", false)
///     .order_by("createdAt", Direction::Descending)
///     .limit(50);
/// assert_eq!(query.filters.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep documents whose field equals `value`.
    #[must_use]
    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.to_owned(),
            op: FilterOp::Equal,
            value: value.into(),
        });
        self
    }

    /// Keep documents whose field is greater than or equal to `value`.
    #[must_use]
    pub fn where_gte(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.to_owned(),
            op: FilterOp::GreaterOrEqual,
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order = Some((field.to_owned(), direction));
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Collection-of-documents storage.
///
/// Implementations provide whatever consistency their backend offers natively;
/// no operation here spans more than one document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document's data, or `None` when absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Create or overwrite a document.
    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError>;

    /// Create a document or overwrite only the given top-level fields.
    async fn merge(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError>;

    /// Apply field operations to an existing document.
    ///
    /// Fails with [`StoreError::NotFound`] if the document does not exist.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        ops: Vec<(String, FieldOp)>,
    ) -> Result<(), StoreError>;

    /// Insert a document under a store-assigned id and return that id.
    async fn add(&self, collection: &str, data: Value) -> Result<String, StoreError>;

    /// Run a query against one collection.
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;
}

/// Read the value at a dotted path.
pub(crate) fn lookup<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(value, |current, segment| current.get(segment))
}

/// Write `new` at a dotted path, creating intermediate maps as needed.
pub(crate) fn assign(target: &mut Map<String, Value>, path: &str, new: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = target;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_owned(), new);
            return;
        }
        let slot = current
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else {
            return;
        };
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_lookup_nested_path() {
        let doc = json!({"invoice": {"id": "inv_1"}, "seen": false});
        assert_eq!(lookup(&doc, "invoice.id"), Some(&json!("inv_1")));
        assert_eq!(lookup(&doc, "seen"), Some(&json!(false)));
        assert_eq!(lookup(&doc, "invoice.short_url"), None);
        assert_eq!(lookup(&doc, "seen.deeper"), None);
    }

    #[test]
    fn test_assign_creates_intermediate_maps() {
        let mut doc = Map::new();
        assign(&mut doc, "data.paymentStatus", json!("paid"));
        assign(&mut doc, "data.invoiceId", json!("inv_1"));
        assert_eq!(
            Value::Object(doc),
            json!({"data": {"paymentStatus": "paid", "invoiceId": "inv_1"}})
        );
    }

    #[test]
    fn test_assign_replaces_scalar_parent() {
        let mut doc = Map::new();
        doc.insert("invoice".to_string(), json!("legacy"));
        assign(&mut doc, "invoice.id", json!("inv_2"));
        assert_eq!(Value::Object(doc), json!({"invoice": {"id": "inv_2"}}));
    }

    #[test]
    fn test_query_builder() {
        let query = Query::new()
            .where_eq("invoice.id", "inv_1")
            .where_gte("createdAt", "2024-01-01T00:00:00.000Z")
            .order_by("createdAt", Direction::Ascending)
            .limit(5);
        assert_eq!(query.filters[0].op, FilterOp::Equal);
        assert_eq!(query.filters[1].op, FilterOp::GreaterOrEqual);
        assert_eq!(
            query.order,
            Some(("createdAt".to_string(), Direction::Ascending))
        );
        assert_eq!(query.limit, Some(5));
    }
}
