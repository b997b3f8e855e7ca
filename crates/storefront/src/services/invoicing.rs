//! Manual invoice issuance from the admin console.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kaalika_core::{InvoiceId, InvoiceRef, NotificationId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::db::NotificationRepository;
use crate::error::AppError;
use crate::razorpay::{InvoiceRequest, RazorpayClient};
use crate::store::DocumentStore;

/// Body of an issue request: a notification to resolve, or an order inline.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    #[serde(default)]
    pub notification_id: Option<NotificationId>,
    #[serde(default)]
    pub order: Option<Value>,
}

/// The issued invoice as returned to the console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedInvoice {
    pub id: String,
    pub short_url: Option<String>,
    pub invoice_pdf: String,
}

/// Create a gateway invoice for a notification's order or an inline order.
///
/// Each call creates a new gateway invoice; callers must not retry blindly.
/// When a notification was given it is marked seen and linked to the
/// invoice. A failure to do so after the invoice exists is logged rather than
/// returned so the caller does not issue a duplicate.
///
/// # Errors
///
/// - `NotFound` if the notification does not exist
/// - `BadRequest` if no order data could be resolved
/// - `Misconfigured` if the store or gateway keys are missing where needed
/// - `Upstream` if the gateway rejects the invoice
#[instrument(skip_all, fields(notification_id = ?request.notification_id))]
pub async fn issue_invoice(
    store: Option<Arc<dyn DocumentStore>>,
    gateway: Option<&RazorpayClient>,
    request: IssueRequest,
    now: DateTime<Utc>,
) -> Result<IssuedInvoice, AppError> {
    let mut order = request.order;
    if let Some(id) = &request.notification_id {
        let store = store
            .as_deref()
            .ok_or_else(|| AppError::Misconfigured("Firebase not configured on server".into()))?;
        let note = NotificationRepository::new(store)
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Notification not found".into()))?;
        let payload = note.notification.payload;
        if !payload.is_null() {
            order = Some(payload);
        }
    }

    let order = order
        .filter(|o| !o.is_null())
        .ok_or_else(|| AppError::BadRequest("Missing order data or notificationId".into()))?;
    let gateway =
        gateway.ok_or_else(|| AppError::Misconfigured("Razorpay keys not configured".into()))?;

    let invoice_request = InvoiceRequest::from_order(&order, now);
    let invoice = gateway
        .create_invoice(&invoice_request)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Razorpay invoice creation failed");
            AppError::upstream("Razorpay create failed", e)
        })?;

    if let (Some(id), Some(store)) = (&request.notification_id, store.as_deref()) {
        let reference = InvoiceRef {
            id: InvoiceId::new(invoice.id.clone()),
            short_url: invoice.short_url.clone(),
        };
        if let Err(e) = NotificationRepository::new(store)
            .mark_issued(id, &reference)
            .await
        {
            tracing::error!(
                notification_id = %id,
                invoice_id = %invoice.id,
                error = %e,
                "Invoice created but notification could not be updated"
            );
        }
    }

    Ok(IssuedInvoice {
        invoice_pdf: format!(
            "/admin/razorpay-pdf?invoiceId={}",
            urlencoding::encode(&invoice.id)
        ),
        id: invoice.id,
        short_url: invoice.short_url,
    })
}
