//! Payment-gateway webhook receiver.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::Result;
use crate::services::reconcile::verify_webhook_request;
use crate::state::AppState;

/// Header carrying the webhook HMAC.
pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Receive a Razorpay webhook.
///
/// The body is taken as raw bytes because the signature covers the exact
/// byte stream. After the signature check passes the answer is always
/// `{"ok": true}`.
#[instrument(skip_all, fields(body_len = body.len()))]
pub async fn razorpay(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let config = state.config();
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    verify_webhook_request(
        config.razorpay.webhook_secret.as_ref(),
        config.diagnostics.test_mode,
        &body,
        signature,
    )?;

    let outcome = state.reconciler().handle(&body, Utc::now()).await;
    tracing::info!(
        event = outcome.event.as_deref().unwrap_or_default(),
        invoice_id = outcome.invoice_id.as_deref().unwrap_or_default(),
        reconciled = outcome.reconciliation.is_some(),
        "Webhook handled"
    );

    Ok(Json(json!({ "ok": true })))
}
