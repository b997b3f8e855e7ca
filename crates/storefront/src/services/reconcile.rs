//! Payment-gateway webhook reconciliation.
//!
//! Once a webhook's signature is accepted, nothing downstream can fail the
//! response: store errors, malformed payloads and order-backend failures are
//! logged and, in test mode, snapshotted to disk.
//!
//! # Flow
//!
//! 1. [`verify_webhook_request`] checks the HMAC over the raw body.
//! 2. [`Reconciler::handle`] parses the event and ignores anything that is
//!    not an `invoice.*` event with a resolvable invoice id.
//! 3. Notifications embedding that invoice id are updated concurrently; if
//!    there are none, one is created.
//! 4. For `invoice.paid` with an order id in the invoice notes, the order
//!    backend is patched in a detached task.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kaalika_core::{Notification, PaymentStatus, timestamp};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::task::{JoinHandle, JoinSet};
use tracing::instrument;

use super::diagnostics::SnapshotWriter;
use super::order_backend::{OrderBackendClient, OrderBackendError};
use crate::db::{ADMIN_NOTIFICATIONS, NotificationRepository};
use crate::error::AppError;
use crate::razorpay::signature;
use crate::store::{DocumentStore, FieldOp, StoreError};

/// Event marking an invoice as settled.
pub const INVOICE_PAID: &str = "invoice.paid";

/// Event marking an invoice as sent to the customer.
pub const INVOICE_ISSUED: &str = "invoice.issued";

/// Check a webhook request before anything else reads its body.
///
/// Without a configured secret, requests are only accepted in test mode.
///
/// # Errors
///
/// - `Misconfigured` when no secret is configured outside test mode
/// - `SignatureInvalid` when the signature is absent or matches neither the
///   hex nor the base64 HMAC of the body
pub fn verify_webhook_request(
    secret: Option<&SecretString>,
    test_mode: bool,
    raw_body: &[u8],
    signature_header: Option<&str>,
) -> Result<(), AppError> {
    let Some(secret) = secret else {
        if test_mode {
            tracing::warn!("Webhook secret not configured; accepting unsigned webhook in test mode");
            return Ok(());
        }
        tracing::error!("Razorpay webhook secret not configured");
        return Err(AppError::Misconfigured("Webhook not configured".into()));
    };

    match signature_header {
        Some(sig) if signature::verify_webhook(secret, raw_body, sig) => Ok(()),
        _ => {
            tracing::warn!("Razorpay webhook signature mismatch");
            Err(AppError::SignatureInvalid)
        }
    }
}

/// What happened to the stored notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// These matching notifications were updated.
    Updated(Vec<String>),
    /// No notification matched; this one was created.
    Created(String),
}

/// Result of handling one accepted webhook.
#[derive(Debug, Default)]
pub struct WebhookOutcome {
    pub event: Option<String>,
    pub invoice_id: Option<String>,
    /// `None` when the event was ignored or the store was unavailable or failed.
    pub reconciliation: Option<Reconciliation>,
    /// The detached order-backend update, when one was started.
    pub order_backend_update: Option<JoinHandle<()>>,
}

/// Applies accepted gateway events to stored notifications.
#[derive(Clone)]
pub struct Reconciler {
    store: Option<Arc<dyn DocumentStore>>,
    order_backend: Option<OrderBackendClient>,
    snapshots: SnapshotWriter,
}

impl Reconciler {
    #[must_use]
    pub fn new(
        store: Option<Arc<dyn DocumentStore>>,
        order_backend: Option<OrderBackendClient>,
        snapshots: SnapshotWriter,
    ) -> Self {
        Self {
            store,
            order_backend,
            snapshots,
        }
    }

    /// Handle an accepted webhook body. Never fails.
    #[instrument(skip_all, fields(event = tracing::field::Empty, invoice_id = tracing::field::Empty))]
    pub async fn handle(&self, raw_body: &[u8], now: DateTime<Utc>) -> WebhookOutcome {
        let body: Value = match serde_json::from_slice(raw_body) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable webhook body");
                let raw = String::from_utf8_lossy(raw_body);
                self.snapshots
                    .write(None, "parse-error", &json!({ "err": e.to_string(), "raw": raw }))
                    .await;
                return WebhookOutcome::default();
            }
        };

        let event = body.get("event").and_then(Value::as_str).unwrap_or_default().to_owned();
        tracing::Span::current().record("event", event.as_str());
        if !event.starts_with("invoice.") {
            tracing::debug!("Ignoring non-invoice webhook event");
            return WebhookOutcome {
                event: Some(event),
                ..WebhookOutcome::default()
            };
        }

        let entity = invoice_entity(&body).cloned().unwrap_or(Value::Null);
        let Some(invoice_id) = invoice_id(&entity) else {
            tracing::warn!("Webhook invoice event missing id");
            self.snapshots.write(None, &event, &body).await;
            return WebhookOutcome {
                event: Some(event),
                ..WebhookOutcome::default()
            };
        };
        tracing::Span::current().record("invoice_id", invoice_id.as_str());

        let reconciliation = match &self.store {
            Some(store) => {
                self.reconcile(store, &event, &invoice_id, &entity, &body, now)
                    .await
            }
            None => {
                tracing::error!("Firebase not initialized; webhook not recorded");
                self.snapshots
                    .write(
                        Some(&invoice_id),
                        &event,
                        &json!({ "inv": entity, "body": body }),
                    )
                    .await;
                None
            }
        };

        let order_backend_update = self.spawn_order_backend_update(&event, &invoice_id, &entity);

        WebhookOutcome {
            event: Some(event),
            invoice_id: Some(invoice_id),
            reconciliation,
            order_backend_update,
        }
    }

    async fn reconcile(
        &self,
        store: &Arc<dyn DocumentStore>,
        event: &str,
        invoice_id: &str,
        entity: &Value,
        body: &Value,
        now: DateTime<Utc>,
    ) -> Option<Reconciliation> {
        let result = match NotificationRepository::new(store.as_ref())
            .find_by_invoice(invoice_id)
            .await
        {
            Ok(matches) if matches.is_empty() => {
                create_notification(store.as_ref(), event, entity, now)
                    .await
                    .map(Reconciliation::Created)
            }
            Ok(matches) => update_matches(store, matches, event, entity, now)
                .await
                .map(Reconciliation::Updated),
            Err(e) => Err(e),
        };

        match result {
            Ok(reconciliation) => {
                tracing::info!(?reconciliation, "Webhook reconciled");
                Some(reconciliation)
            }
            Err(e) => {
                tracing::error!(error = %e, "Store update failed for webhook");
                self.snapshots
                    .write(
                        Some(invoice_id),
                        event,
                        &json!({ "err": e.to_string(), "inv": entity, "body": body }),
                    )
                    .await;
                None
            }
        }
    }

    fn spawn_order_backend_update(
        &self,
        event: &str,
        invoice_id: &str,
        entity: &Value,
    ) -> Option<JoinHandle<()>> {
        if event != INVOICE_PAID {
            return None;
        }
        let order_id = notes_order_id(entity)?;
        let Some(client) = self.order_backend.clone() else {
            tracing::debug!(order_id, "Order backend not configured; skipping payment update");
            return None;
        };

        let snapshots = self.snapshots.clone();
        let invoice_id = invoice_id.to_owned();
        Some(tokio::spawn(async move {
            match client.mark_paid(&order_id, &invoice_id).await {
                Ok(()) => {}
                Err(OrderBackendError::Api { status, message }) => {
                    tracing::warn!(
                        order_id,
                        status,
                        payment_status = PaymentStatus::Paid.as_str(),
                        "Order backend update returned non-OK"
                    );
                    snapshots
                        .write(
                            Some(&invoice_id),
                            "order-backend-update-failed",
                            &json!({ "status": status, "text": message }),
                        )
                        .await;
                }
                Err(OrderBackendError::Http(e)) => {
                    tracing::error!(order_id, error = %e, "Failed to update order backend");
                    snapshots
                        .write(
                            Some(&invoice_id),
                            "order-backend-update-exception",
                            &json!({ "err": e.to_string() }),
                        )
                        .await;
                }
            }
        }))
    }
}

/// The invoice entity: `payload.invoice.entity`, else `payload.entity`.
fn invoice_entity(body: &Value) -> Option<&Value> {
    let payload = body.get("payload")?;
    let entity = match payload.get("invoice") {
        Some(invoice) if truthy(invoice) => invoice.get("entity"),
        _ => payload.get("entity"),
    };
    entity.filter(|entity| !entity.is_null())
}

fn invoice_id(entity: &Value) -> Option<String> {
    ["id", "invoice_id"]
        .iter()
        .filter_map(|key| entity.get(*key))
        .find_map(text)
}

/// Order id carried in the invoice notes.
fn notes_order_id(entity: &Value) -> Option<String> {
    let notes = entity.get("notes")?;
    ["orderId", "order_id", "order"]
        .iter()
        .filter_map(|key| notes.get(*key))
        .find_map(text)
}

/// Non-empty string, or a number rendered as text.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

fn event_fields(event: &str, entity: &Value, now: DateTime<Utc>) -> Vec<(String, FieldOp)> {
    let stamp = Value::String(timestamp::format(&now));
    let mut ops = vec![("invoice".to_string(), FieldOp::Set(entity.clone()))];
    if event == INVOICE_PAID {
        ops.push(("paid".to_string(), FieldOp::Set(Value::Bool(true))));
        ops.push(("paidAt".to_string(), FieldOp::Set(stamp.clone())));
        ops.push(("seen".to_string(), FieldOp::Set(Value::Bool(true))));
    }
    if event == INVOICE_ISSUED {
        ops.push(("issuedAt".to_string(), FieldOp::Set(stamp)));
    }
    ops
}

async fn update_matches(
    store: &Arc<dyn DocumentStore>,
    ids: Vec<String>,
    event: &str,
    entity: &Value,
    now: DateTime<Utc>,
) -> Result<Vec<String>, StoreError> {
    let mut updates = JoinSet::new();
    for id in ids {
        let store = Arc::clone(store);
        let ops = event_fields(event, entity, now);
        updates.spawn(async move {
            store.update(ADMIN_NOTIFICATIONS, &id, ops).await?;
            Ok::<_, StoreError>(id)
        });
    }

    let mut updated = Vec::with_capacity(updates.len());
    let mut first_error = None;
    while let Some(joined) = updates.join_next().await {
        match joined {
            Ok(Ok(id)) => updated.push(id),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Notification update failed");
                first_error.get_or_insert(e);
            }
            Err(e) => {
                tracing::error!(error = %e, "Notification update task panicked");
                first_error.get_or_insert(StoreError::Codec(e.to_string()));
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => {
            updated.sort();
            Ok(updated)
        }
    }
}

async fn create_notification(
    store: &dyn DocumentStore,
    event: &str,
    entity: &Value,
    now: DateTime<Utc>,
) -> Result<String, StoreError> {
    let paid = event == INVOICE_PAID;
    let mut notification = Notification::new(
        json!({ "invoiceEvent": event, "invoice": entity }),
        now,
        paid,
    );
    notification.invoice = Some(entity.clone());
    if paid {
        notification.paid = Some(true);
        notification.paid_at = Some(now);
    }
    if event == INVOICE_ISSUED {
        notification.issued_at = Some(now);
    }

    let id = NotificationRepository::new(store)
        .insert(&notification)
        .await?;
    Ok(id.into_inner())
}
