//! In-process document store.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{
    Direction, Document, DocumentStore, FieldOp, FilterOp, Query, StoreError, assign, lookup,
};

type Collection = BTreeMap<String, Value>;

/// A [`DocumentStore`] held entirely in memory.
///
/// Mirrors the Firestore semantics the storefront relies on: merge writes,
/// `NotFound` on update of a missing document, array-union appends, and
/// queries that skip documents lacking a filtered or ordered field.
///
/// Collections marked with [`MemoryStore::fail_collection`] answer every
/// operation with an API error, standing in for a backend outage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    failing: RwLock<HashSet<String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All documents of a collection, ordered by id.
    pub async fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Make every later operation on `collection` fail with a 503.
    pub async fn fail_collection(&self, collection: &str) {
        self.failing.write().await.insert(collection.to_owned());
    }

    async fn check(&self, collection: &str) -> Result<(), StoreError> {
        if self.failing.read().await.contains(collection) {
            return Err(StoreError::Api {
                status: 503,
                message: format!("{collection} is unavailable"),
            });
        }
        Ok(())
    }
}

fn as_object(collection: &str, data: Value) -> Result<Map<String, Value>, StoreError> {
    match data {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Codec(format!(
            "{collection}: documents must be JSON objects, got {other}"
        ))),
    }
}

/// Order two field values the way the backend does for like-typed values.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn matches(data: &Value, query: &Query) -> bool {
    query.filters.iter().all(|filter| {
        lookup(data, &filter.field).is_some_and(|field| match filter.op {
            FilterOp::Equal => field == &filter.value,
            FilterOp::GreaterOrEqual => {
                compare(field, &filter.value).is_some_and(|o| o != Ordering::Less)
            }
        })
    })
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.check(collection).await?;
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        self.check(collection).await?;
        let data = as_object(collection, data)?;
        self.collections
            .write()
            .await
            .entry(collection.to_owned())
            .or_default()
            .insert(id.to_owned(), Value::Object(data));
        Ok(())
    }

    async fn merge(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.check(collection).await?;
        let mut collections = self.collections.write().await;
        let doc = collections
            .entry(collection.to_owned())
            .or_default()
            .entry(id.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(existing) = doc {
            existing.extend(fields);
        }
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        ops: Vec<(String, FieldOp)>,
    ) -> Result<(), StoreError> {
        self.check(collection).await?;
        let mut collections = self.collections.write().await;
        let Some(Value::Object(doc)) = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
        else {
            return Err(StoreError::NotFound {
                collection: collection.to_owned(),
                id: id.to_owned(),
            });
        };

        for (path, op) in ops {
            match op {
                FieldOp::Set(value) => assign(doc, &path, value),
                FieldOp::ArrayUnion(values) => {
                    let mut current = match lookup(&Value::Object(doc.clone()), &path) {
                        Some(Value::Array(items)) => items.clone(),
                        _ => Vec::new(),
                    };
                    for value in values {
                        if !current.contains(&value) {
                            current.push(value);
                        }
                    }
                    assign(doc, &path, Value::Array(current));
                }
            }
        }
        Ok(())
    }

    async fn add(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.set(collection, &id, data).await?;
        Ok(id)
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.check(collection).await?;
        let mut found: Vec<Document> = self
            .documents(collection)
            .await
            .into_iter()
            .filter(|doc| matches(&doc.data, query))
            .collect();

        if let Some((field, direction)) = &query.order {
            found.retain(|doc| lookup(&doc.data, field).is_some());
            found.sort_by(|a, b| {
                let ordering = match (lookup(&a.data, field), lookup(&b.data, field)) {
                    (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
                    _ => Ordering::Equal,
                };
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        Ok(found)
    }
}
