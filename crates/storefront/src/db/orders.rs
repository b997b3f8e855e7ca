//! Order repository.

use kaalika_core::{Order, OrderId};
use serde_json::Value;

use super::ORDERS;
use crate::store::{DocumentStore, StoreError};

/// Repository for the global orders collection.
pub struct OrderRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Fetch an order document exactly as stored.
    ///
    /// Older records predate the current [`Order`] shape, so the document is
    /// returned untyped.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read fails.
    pub async fn get(&self, id: &OrderId) -> Result<Option<Value>, StoreError> {
        self.store.get(ORDERS, id.as_str()).await
    }

    /// Write an order under its id, replacing any previous document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails.
    pub async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        self.store
            .set(ORDERS, order.id.as_str(), serde_json::to_value(order)?)
            .await
    }
}
