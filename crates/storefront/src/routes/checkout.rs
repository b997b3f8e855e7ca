//! Checkout route handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use chrono::Utc;
use kaalika_core::CurrencyCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::IdentityUser;
use crate::razorpay::CreateOrderRequest;
use crate::services::checkout::{CheckoutRequest, place_order};
use crate::state::AppState;

/// Place an order for the signed-in shopper.
///
/// The admin notification is written in the background; its outcome does not
/// affect the response.
#[instrument(skip_all, fields(uid = %user.uid))]
pub async fn checkout(
    State(state): State<AppState>,
    IdentityUser(user): IdentityUser,
    payload: std::result::Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let store = state.require_store("Firebase not configured")?;
    let gateway_secret = state.config().razorpay.key_secret.as_ref();

    let placed = place_order(store, gateway_secret, &user, request, Utc::now())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Checkout failed"))?;

    Ok(Json(json!({
        "success": true,
        "orderId": placed.order.id,
        "redirectUrl": placed.redirect_url(),
    })))
}

/// Body of a gateway order request.
#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    /// Minor currency units.
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<CurrencyCode>,
    #[serde(default)]
    pub receipt: Option<String>,
}

/// Create a gateway order for the checkout widget.
#[instrument(skip_all)]
pub async fn create_order(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateOrderBody>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(body) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    if body.amount <= 0 {
        return Err(AppError::BadRequest("Amount must be positive".into()));
    }
    let gateway = state
        .razorpay()
        .ok_or_else(|| AppError::Misconfigured("Razorpay keys not configured".into()))?;

    let order = gateway
        .create_order(&CreateOrderRequest {
            amount: body.amount,
            currency: body.currency.unwrap_or_default(),
            receipt: body.receipt,
        })
        .await
        .map_err(|e| AppError::upstream("Razorpay order creation failed", e))?;

    Ok(Json(json!({
        "id": order.id,
        "amount": order.amount,
        "currency": order.currency,
    })))
}

/// Automated invoice email was replaced by the admin invoice workflow.
pub async fn send_invoice() -> AppError {
    AppError::Gone("Automated emailing disabled. Use admin Razorpay invoice workflow.".into())
}
