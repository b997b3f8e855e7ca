//! User profile repository.

use kaalika_core::{Order, UserProfile, UserUid};
use serde_json::{Map, Value};

use super::USERS;
use crate::store::{DocumentStore, FieldOp, StoreError};

/// Repository for user profile documents.
pub struct ProfileRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> ProfileRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Get a profile by subject.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read fails or the document is malformed.
    pub async fn get(&self, uid: &UserUid) -> Result<Option<UserProfile>, StoreError> {
        self.store
            .get(USERS, uid.as_str())
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(StoreError::from)
    }

    /// Create or replace a profile.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails.
    pub async fn create(&self, uid: &UserUid, profile: &UserProfile) -> Result<(), StoreError> {
        self.store
            .set(USERS, uid.as_str(), serde_json::to_value(profile)?)
            .await
    }

    /// Create an empty profile unless one exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read or write fails.
    pub async fn ensure_exists(&self, uid: &UserUid) -> Result<(), StoreError> {
        if self.store.get(USERS, uid.as_str()).await?.is_none() {
            self.create(uid, &UserProfile::default()).await?;
        }
        Ok(())
    }

    /// Append an order and its summary to the profile's lists.
    ///
    /// Both appends are one atomic array-union write, so concurrent checkouts
    /// by the same user cannot drop each other's entries.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the profile does not exist.
    pub async fn append_order(&self, uid: &UserUid, order: &Order) -> Result<(), StoreError> {
        let ops = vec![
            (
                "orderHistory".to_string(),
                FieldOp::ArrayUnion(vec![serde_json::to_value(order)?]),
            ),
            (
                "invoices".to_string(),
                FieldOp::ArrayUnion(vec![serde_json::to_value(order.summary())?]),
            ),
        ];
        self.store.update(USERS, uid.as_str(), ops).await
    }

    /// Merge name and/or email onto the profile, creating it if needed.
    ///
    /// Absent fields are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails.
    pub async fn merge_contact(
        &self,
        uid: &UserUid,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut fields = Map::new();
        if let Some(name) = name {
            fields.insert("name".to_string(), Value::from(name));
        }
        if let Some(email) = email {
            fields.insert("email".to_string(), Value::from(email));
        }
        if fields.is_empty() {
            return Ok(());
        }
        self.store.merge(USERS, uid.as_str(), fields).await
    }
}
