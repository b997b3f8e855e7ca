//! Admin console route handlers.
//!
//! Everything except `notify-order` requires the admin shared secret. The
//! console polls the list and the unread count every 20 seconds, so both are
//! plain reads with no caching.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use kaalika_core::Notification;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::db::NotificationRepository;
use crate::error::{AppError, Result};
use crate::middleware::AdminAuth;
use crate::services::invoicing::{IssueRequest, issue_invoice};
use crate::state::AppState;

/// Notifications returned by the list endpoint.
pub const RECENT_LIMIT: usize = 50;

/// Trailing window for the unread count.
pub const UNREAD_WINDOW_DAYS: i64 = 7;

const STORE_MISSING: &str = "Firebase not configured on server";

/// Record an arbitrary order payload as a new unseen notification.
#[instrument(skip_all)]
pub async fn notify_order(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let store = state.require_store(STORE_MISSING)?;

    let id = NotificationRepository::new(store.as_ref())
        .insert(&Notification::new(payload, Utc::now(), false))
        .await?;
    tracing::info!(notification_id = %id, "Admin notification recorded");

    Ok(Json(json!({ "success": true, "id": id })))
}

/// List the most recent notifications, newest first.
pub async fn notifications(State(state): State<AppState>, _: AdminAuth) -> Result<Json<Value>> {
    let store = state.require_store(STORE_MISSING)?;
    let notifications = NotificationRepository::new(store.as_ref())
        .recent(RECENT_LIMIT)
        .await?;
    Ok(Json(json!({ "notifications": notifications })))
}

/// Count unseen notifications from the trailing window.
pub async fn unread_count(State(state): State<AppState>, _: AdminAuth) -> Result<Json<Value>> {
    let store = state.require_store(STORE_MISSING)?;
    let since = Utc::now() - Duration::days(UNREAD_WINDOW_DAYS);
    let count = NotificationRepository::new(store.as_ref())
        .count_unseen_since(since)
        .await?;
    Ok(Json(json!({ "count": count })))
}

/// Issue a gateway invoice for a notification or an inline order.
#[instrument(skip_all)]
pub async fn razorpay_issue(
    State(state): State<AppState>,
    _: AdminAuth,
    payload: std::result::Result<Json<IssueRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let invoice = issue_invoice(state.store(), state.razorpay(), request, Utc::now()).await?;
    Ok(Json(json!({ "success": true, "invoice": invoice })))
}

#[derive(Debug, Deserialize)]
pub struct PdfQuery {
    #[serde(rename = "invoiceId")]
    pub invoice_id: Option<String>,
}

/// Proxy an invoice PDF from the gateway.
#[instrument(skip_all, fields(invoice_id = ?query.invoice_id))]
pub async fn razorpay_pdf(
    State(state): State<AppState>,
    _: AdminAuth,
    Query(query): Query<PdfQuery>,
) -> Result<Response> {
    let invoice_id = query
        .invoice_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing invoiceId".into()))?;
    let gateway = state
        .razorpay()
        .ok_or_else(|| AppError::Misconfigured("Razorpay keys not configured".into()))?;

    let pdf = gateway.invoice_pdf(&invoice_id).await.map_err(|e| {
        tracing::warn!(error = %e, "Invoice PDF download failed");
        AppError::upstream("Failed to download PDF", e)
    })?;

    let disposition = format!(
        "attachment; filename=\"invoice-{}.pdf\"",
        invoice_id.replace(['"', '\\', '\r', '\n'], "")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf.bytes,
    )
        .into_response())
}
