//! Order intake.
//!
//! Turns a verified buyer's cart into an [`Order`], appends it to the buyer's
//! profile, mirrors it into the global orders collection and raises an admin
//! notification.
//!
//! The profile append and the global write are two separate document writes.
//! If the second fails after the first succeeded the collections disagree;
//! this is logged at error level and surfaced as a 500, never rolled back.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kaalika_core::{
    Amount, CartError, CartItem, CustomerContact, Notification, Order, OrderId, PaymentMethod,
    PaymentReference, validate_cart,
};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::instrument;

use crate::db::{NotificationRepository, OrderRepository, ProfileRepository};
use crate::error::AppError;
use crate::firebase::VerifiedIdentity;
use crate::razorpay::signature;
use crate::store::{DocumentStore, StoreError};

/// Checkout request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub cart: Vec<CartItem>,
    #[serde(default)]
    pub total_cost: Option<Amount>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default, rename = "razorpay_order_id")]
    pub razorpay_order_id: Option<String>,
    #[serde(default, rename = "razorpay_payment_id")]
    pub razorpay_payment_id: Option<String>,
    #[serde(default, rename = "razorpay_signature")]
    pub razorpay_signature: Option<String>,
}

/// Errors raised while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Invalid cart: {0}")]
    Cart(#[from] CartError),

    #[error("Incomplete payment details")]
    IncompletePayment,

    #[error("Payment verification failed")]
    PaymentSignature,

    #[error("Razorpay keys not configured")]
    GatewayNotConfigured,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Cart(_)
            | CheckoutError::IncompletePayment
            | CheckoutError::PaymentSignature => Self::BadRequest(err.to_string()),
            CheckoutError::GatewayNotConfigured => Self::Misconfigured(err.to_string()),
            CheckoutError::Store(e) => Self::Store(e),
        }
    }
}

/// A placed order and the detached notification insert.
#[derive(Debug)]
pub struct PlacedOrder {
    pub order: Order,
    /// Completes once the admin notification write finished or failed.
    pub notification: JoinHandle<()>,
}

impl PlacedOrder {
    /// Where the browser goes after checkout.
    #[must_use]
    pub fn redirect_url(&self) -> String {
        format!(
            "/order/success?orderId={}",
            urlencoding::encode(self.order.id.as_str())
        )
    }
}

/// Place an order for a verified buyer.
///
/// `gateway_secret` is only consulted when the request carries a captured
/// payment to verify.
///
/// # Errors
///
/// Returns `CheckoutError` if the cart or payment proof is invalid, or if a
/// profile or order write fails.
#[instrument(skip_all, fields(uid = %identity.uid, lines = request.cart.len()))]
pub async fn place_order(
    store: Arc<dyn DocumentStore>,
    gateway_secret: Option<&SecretString>,
    identity: &VerifiedIdentity,
    request: CheckoutRequest,
    now: DateTime<Utc>,
) -> Result<PlacedOrder, CheckoutError> {
    let total = validate_cart(&request.cart, request.total_cost)?;
    let payment = verify_payment(&request, gateway_secret)?;

    let id = payment.as_ref().map_or_else(
        || OrderId::from_timestamp(now),
        |p| OrderId::new(p.gateway_order_id.clone()),
    );
    let order = Order {
        id,
        items: request.cart,
        total,
        date: now,
        payment_method: request.payment_method.as_deref().map(PaymentMethod::classify),
        customer: CustomerContact {
            name: request.name,
            email: request.customer_email.or_else(|| identity.email.clone()),
            phone: request.phone,
            address: request.address,
        },
        payment,
        user_id: Some(identity.uid.as_str().to_owned()),
    };

    let profiles = ProfileRepository::new(store.as_ref());
    profiles.ensure_exists(&identity.uid).await?;
    profiles.append_order(&identity.uid, &order).await?;

    if let Err(e) = OrderRepository::new(store.as_ref()).insert(&order).await {
        tracing::error!(
            order_id = %order.id,
            uid = %identity.uid,
            error = %e,
            "Order appended to profile but global order write failed"
        );
        return Err(e.into());
    }

    tracing::info!(order_id = %order.id, total = %order.total, "Order placed");

    let notification = spawn_notification(store, notification_payload(&order), now);
    Ok(PlacedOrder {
        order,
        notification,
    })
}

fn verify_payment(
    request: &CheckoutRequest,
    gateway_secret: Option<&SecretString>,
) -> Result<Option<PaymentReference>, CheckoutError> {
    let (order_id, payment_id, sig) = match (
        request.razorpay_order_id.as_deref(),
        request.razorpay_payment_id.as_deref(),
        request.razorpay_signature.as_deref(),
    ) {
        (None, None, None) => return Ok(None),
        (Some(o), Some(p), Some(s)) => (o, p, s),
        _ => return Err(CheckoutError::IncompletePayment),
    };

    let secret = gateway_secret.ok_or(CheckoutError::GatewayNotConfigured)?;
    if !signature::verify_payment(secret, order_id, payment_id, sig) {
        tracing::warn!(gateway_order_id = order_id, "Payment signature mismatch");
        return Err(CheckoutError::PaymentSignature);
    }

    Ok(Some(PaymentReference {
        gateway_order_id: order_id.to_owned(),
        gateway_payment_id: payment_id.to_owned(),
    }))
}

/// The order as the admin console and invoicing read it.
fn notification_payload(order: &Order) -> Value {
    json!({
        "orderId": order.id,
        "cart": order.items,
        "totalCost": order.total,
        "name": order.customer.name,
        "customerEmail": order.customer.email,
        "phone": order.customer.phone,
        "address": order.customer.address,
        "paymentMethod": order.payment_method,
        "userId": order.user_id,
        "date": kaalika_core::timestamp::format(&order.date),
    })
}

fn spawn_notification(
    store: Arc<dyn DocumentStore>,
    payload: Value,
    now: DateTime<Utc>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let notification = Notification::new(payload, now, false);
        match NotificationRepository::new(store.as_ref())
            .insert(&notification)
            .await
        {
            Ok(id) => tracing::info!(notification_id = %id, "Admin notification created"),
            Err(e) => tracing::error!(error = %e, "Failed to create admin notification"),
        }
    })
}
