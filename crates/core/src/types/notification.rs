//! Admin notifications: the store's record of a purchase event awaiting, or
//! having received, invoice issuance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{InvoiceId, NotificationId};

/// Reference to a gateway invoice embedded in a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRef {
    pub id: InvoiceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_url: Option<String>,
}

/// An admin notification document.
///
/// `payload` is opaque: the originating order for checkout notifications, or
/// the raw gateway event for notifications created by the webhook. `invoice`
/// is either the [`InvoiceRef`] written at issuance or the latest invoice
/// snapshot merged in by the webhook, so it is kept untyped here; use
/// [`Notification::invoice_ref`] to read the reference part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(with = "crate::types::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub seen: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::types::timestamp::option"
    )]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::types::timestamp::option"
    )]
    pub issued_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// A fresh notification for the given payload.
    #[must_use]
    pub const fn new(payload: serde_json::Value, created_at: DateTime<Utc>, seen: bool) -> Self {
        Self {
            payload,
            created_at,
            seen,
            invoice: None,
            paid: None,
            paid_at: None,
            issued_at: None,
        }
    }

    /// The embedded invoice reference, if one has been attached.
    #[must_use]
    pub fn invoice_ref(&self) -> Option<InvoiceRef> {
        let invoice = self.invoice.as_ref()?;
        let id = invoice.get("id")?.as_str()?;
        Some(InvoiceRef {
            id: InvoiceId::new(id),
            short_url: invoice
                .get("short_url")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned),
        })
    }

    /// Whether the gateway has reported this notification's invoice as paid.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.paid.unwrap_or(false)
    }
}

/// A notification together with its store-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredNotification {
    pub id: NotificationId,
    #[serde(flatten)]
    pub notification: Notification,
}
