//! Orders, carts and the summaries denormalized onto user profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::id::OrderId;
use super::price::Amount;
use super::status::PaymentMethod;

/// One line of a shopping cart as submitted by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Catalog product reference. Numeric ids from the CMS are stored as text.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    /// Unit price.
    pub price: Amount,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl CartItem {
    /// Unit price × quantity, or `None` past the decimal range.
    #[must_use]
    pub fn line_total(&self) -> Option<Amount> {
        self.price.checked_mul(self.quantity)
    }
}

const fn default_quantity() -> u32 {
    1
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number product id, got {other}"
        ))),
    }
}

/// Errors raised when a cart cannot be turned into an order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("cart is empty")]
    Empty,
    #[error("cart line {index} has zero quantity")]
    ZeroQuantity { index: usize },
    #[error("cart line {index} has a negative price")]
    NegativePrice { index: usize },
    #[error("cart total mismatch: submitted {submitted}, computed {computed}")]
    TotalMismatch { submitted: Amount, computed: Amount },
    #[error("cart total is too large")]
    Overflow,
}

/// Sum of `price × quantity` over the given lines, or `None` past the
/// decimal range.
#[must_use]
pub fn cart_total(items: &[CartItem]) -> Option<Amount> {
    items
        .iter()
        .map(CartItem::line_total)
        .try_fold(Amount::ZERO, |total, line| total.checked_add(line?))
}

/// Validate a cart and reconcile it with the total the client submitted.
///
/// Returns the authoritative total.
///
/// # Errors
///
/// Returns `CartError` if the cart is empty, contains invalid lines, its
/// total is out of range, or the submitted total disagrees with the
/// computed one.
pub fn validate_cart(items: &[CartItem], submitted: Option<Amount>) -> Result<Amount, CartError> {
    if items.is_empty() {
        return Err(CartError::Empty);
    }
    for (index, item) in items.iter().enumerate() {
        if item.quantity == 0 {
            return Err(CartError::ZeroQuantity { index });
        }
        if item.price.is_negative() {
            return Err(CartError::NegativePrice { index });
        }
    }

    let computed = cart_total(items).ok_or(CartError::Overflow)?;
    match submitted {
        Some(submitted) if submitted != computed => Err(CartError::TotalMismatch {
            submitted,
            computed,
        }),
        _ => Ok(computed),
    }
}

/// Customer contact details captured at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Gateway identifiers proving an online payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReference {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
}

/// A placed order.
///
/// Mirrored into the global orders collection and, in full, onto the owning
/// user's order history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub items: Vec<CartItem>,
    pub total: Amount,
    #[serde(with = "crate::types::timestamp")]
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub customer: CustomerContact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentReference>,
    /// Identity-provider subject of the buyer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Order {
    /// The trimmed summary appended to the owner's invoice list.
    #[must_use]
    pub fn summary(&self) -> OrderSummary {
        OrderSummary {
            id: self.id.clone(),
            date: self.date,
            total: self.total,
        }
    }
}

/// Invoice-list entry on a user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    #[serde(with = "crate::types::timestamp")]
    pub date: DateTime<Utc>,
    pub total: Amount,
}
