//! Admin notification repository.

use chrono::{DateTime, Utc};
use kaalika_core::{InvoiceRef, Notification, NotificationId, StoredNotification, timestamp};
use serde_json::{Value, json};

use super::ADMIN_NOTIFICATIONS;
use crate::store::{Direction, Document, DocumentStore, FieldOp, Query, StoreError};

/// Field holding the embedded gateway invoice id.
pub const INVOICE_ID_FIELD: &str = "invoice.id";

/// Repository for admin notifications.
pub struct NotificationRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> NotificationRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Insert a notification and return its store-assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails.
    pub async fn insert(&self, notification: &Notification) -> Result<NotificationId, StoreError> {
        let id = self
            .store
            .add(ADMIN_NOTIFICATIONS, serde_json::to_value(notification)?)
            .await?;
        Ok(NotificationId::new(id))
    }

    /// Get a notification by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read fails or the document is malformed.
    pub async fn get(&self, id: &NotificationId) -> Result<Option<StoredNotification>, StoreError> {
        let Some(data) = self.store.get(ADMIN_NOTIFICATIONS, id.as_str()).await? else {
            return Ok(None);
        };
        Ok(Some(StoredNotification {
            id: id.clone(),
            notification: serde_json::from_value(data)?,
        }))
    }

    /// The most recent notifications, newest first.
    ///
    /// Documents that fail to decode are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    pub async fn recent(&self, limit: usize) -> Result<Vec<StoredNotification>, StoreError> {
        let query = Query::new()
            .order_by("createdAt", Direction::Descending)
            .limit(limit);
        let docs = self.store.query(ADMIN_NOTIFICATIONS, &query).await?;
        Ok(docs.into_iter().filter_map(decode).collect())
    }

    /// Count unseen notifications created at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    pub async fn count_unseen_since(&self, since: DateTime<Utc>) -> Result<usize, StoreError> {
        let query = Query::new()
            .where_eq("seen", false)
            .where_gte("createdAt", timestamp::format(&since));
        Ok(self.store.query(ADMIN_NOTIFICATIONS, &query).await?.len())
    }

    /// Ids of notifications whose embedded invoice id equals `invoice_id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    pub async fn find_by_invoice(&self, invoice_id: &str) -> Result<Vec<String>, StoreError> {
        let query = Query::new().where_eq(INVOICE_ID_FIELD, invoice_id);
        let docs = self.store.query(ADMIN_NOTIFICATIONS, &query).await?;
        Ok(docs.into_iter().map(|doc| doc.id).collect())
    }

    /// Mark a notification seen and attach the issued invoice reference.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the notification no longer exists.
    pub async fn mark_issued(
        &self,
        id: &NotificationId,
        invoice: &InvoiceRef,
    ) -> Result<(), StoreError> {
        let ops = vec![
            ("seen".to_string(), FieldOp::Set(Value::Bool(true))),
            (
                "invoice".to_string(),
                FieldOp::Set(json!({
                    "id": invoice.id.as_str(),
                    "short_url": invoice.short_url,
                })),
            ),
        ];
        self.store.update(ADMIN_NOTIFICATIONS, id.as_str(), ops).await
    }
}

fn decode(doc: Document) -> Option<StoredNotification> {
    match serde_json::from_value::<Notification>(doc.data) {
        Ok(notification) => Some(StoredNotification {
            id: NotificationId::new(doc.id),
            notification,
        }),
        Err(e) => {
            tracing::warn!(notification_id = %doc.id, error = %e, "Skipping malformed notification");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use kaalika_core::InvoiceId;

    use super::*;
    use crate::store::MemoryStore;

    fn note_at(created_at: DateTime<Utc>, seen: bool) -> Notification {
        Notification::new(json!({"orderId": "1"}), created_at, seen)
    }

    #[tokio::test]
    async fn test_recent_orders_newest_first_and_limits() {
        let store = MemoryStore::new();
        let repo = NotificationRepository::new(&store);
        let now = Utc::now();
        for minutes in [30, 10, 20] {
            repo.insert(&note_at(now - Duration::minutes(minutes), false))
                .await
                .unwrap();
        }

        let recent = repo.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(
            recent[0].notification.created_at,
            timestamp::parse(&timestamp::format(&(now - Duration::minutes(10)))).unwrap()
        );
        assert!(recent[0].notification.created_at > recent[1].notification.created_at);
    }

    #[tokio::test]
    async fn test_recent_skips_malformed() {
        let store = MemoryStore::new();
        store
            .add(ADMIN_NOTIFICATIONS, json!({"createdAt": "not a time", "seen": false}))
            .await
            .unwrap();
        let repo = NotificationRepository::new(&store);
        repo.insert(&note_at(Utc::now(), false)).await.unwrap();

        assert_eq!(repo.recent(50).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_count_unseen_since_window() {
        let store = MemoryStore::new();
        let repo = NotificationRepository::new(&store);
        let now = Utc::now();
        repo.insert(&note_at(now - Duration::days(1), false))
            .await
            .unwrap();
        repo.insert(&note_at(now - Duration::days(2), true))
            .await
            .unwrap();
        repo.insert(&note_at(now - Duration::days(8), false))
            .await
            .unwrap();

        let count = repo
            .count_unseen_since(now - Duration::days(7))
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_mark_issued_then_find_by_invoice() {
        let store = MemoryStore::new();
        let repo = NotificationRepository::new(&store);
        let id = repo.insert(&note_at(Utc::now(), false)).await.unwrap();
        repo.insert(&note_at(Utc::now(), false)).await.unwrap();

        repo.mark_issued(
            &id,
            &InvoiceRef {
                id: InvoiceId::new("inv_1"),
                short_url: Some("https://rzp.io/i/x".to_string()),
            },
        )
        .await
        .unwrap();

        assert_eq!(repo.find_by_invoice("inv_1").await.unwrap(), vec![
            id.as_str().to_string()
        ]);
        let stored = repo.get(&id).await.unwrap().unwrap();
        assert!(stored.notification.seen);
        assert_eq!(
            stored.notification.invoice_ref().unwrap().id.as_str(),
            "inv_1"
        );
    }

    #[tokio::test]
    async fn test_mark_issued_missing_is_not_found() {
        let store = MemoryStore::new();
        let repo = NotificationRepository::new(&store);
        let err = repo
            .mark_issued(
                &NotificationId::new("nope"),
                &InvoiceRef {
                    id: InvoiceId::new("inv_1"),
                    short_url: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
