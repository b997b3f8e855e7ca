//! Invoice requests built from loosely-shaped order payloads.
//!
//! Order payloads reach the issuance helper either from a stored notification
//! or straight from the admin console, so every field is optional and several
//! have legacy aliases.

use chrono::{DateTime, Duration, Utc};
use kaalika_core::{Amount, CurrencyCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Days between issuance and due date.
pub const INVOICE_DUE_DAYS: i64 = 7;

/// Body of `POST /invoices`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceRequest {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub description: String,
    pub customer: InvoiceCustomer,
    pub line_items: Vec<LineItem>,
    /// Unix seconds.
    pub date: i64,
    /// Unix seconds.
    pub due_date: i64,
    pub currency: &'static str,
    pub notes: InvoiceNotes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceCustomer {
    pub name: String,
    pub email: String,
    pub contact: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub name: String,
    pub amount: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceNotes {
    /// The originating order id, or null.
    #[serde(rename = "orderId")]
    pub order_id: Value,
}

/// The parts of a gateway invoice response this service uses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Invoice {
    pub id: String,
    #[serde(default)]
    pub short_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl InvoiceRequest {
    /// Build an invoice request for an order payload, issued at `now`.
    #[must_use]
    pub fn from_order(order: &Value, now: DateTime<Utc>) -> Self {
        let customer = InvoiceCustomer {
            name: first_text(order, &["name", "customerName"]).unwrap_or_else(|| "Customer".into()),
            email: first_text(order, &["customerEmail", "email"]).unwrap_or_default(),
            contact: first_text(order, &["phone", "customerPhone"]).unwrap_or_default(),
        };

        let line_items = match order.get("cart").and_then(Value::as_array) {
            Some(cart) => cart.iter().map(cart_line).collect(),
            None => {
                let total = ["totalCost", "total"]
                    .iter()
                    .filter_map(|key| order.get(*key).and_then(amount))
                    .find(|total| !total.as_decimal().is_zero())
                    .unwrap_or(Amount::ZERO);
                vec![LineItem {
                    name: "Order".to_string(),
                    amount: total.round_units(),
                    quantity: 1,
                }]
            }
        };

        let order_id = ["orderId", "id"]
            .iter()
            .filter_map(|key| order.get(*key))
            .find(|v| truthy(v))
            .cloned()
            .unwrap_or(Value::Null);

        Self {
            kind: "invoice",
            description: "Order invoice".to_string(),
            customer,
            line_items,
            date: now.timestamp(),
            due_date: (now + Duration::days(INVOICE_DUE_DAYS)).timestamp(),
            currency: CurrencyCode::INR.code(),
            notes: InvoiceNotes { order_id },
        }
    }

    /// Sum of `amount` over the line items, clamped to `i64`.
    #[must_use]
    pub fn line_total(&self) -> i64 {
        self.line_items
            .iter()
            .fold(0, |total: i64, item| total.saturating_add(item.amount))
    }
}

fn cart_line(entry: &Value) -> LineItem {
    let quantity = entry
        .get("quantity")
        .and_then(Value::as_u64)
        .and_then(|q| u32::try_from(q).ok())
        .filter(|q| *q > 0)
        .unwrap_or(1);
    let price = entry.get("price").and_then(amount).unwrap_or(Amount::ZERO);
    LineItem {
        name: entry
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("Item")
            .to_string(),
        // Stored payloads are unvalidated; clamp rather than overflow.
        amount: price.saturating_mul(quantity).round_units(),
        quantity,
    }
}

fn amount(value: &Value) -> Option<Amount> {
    serde_json::from_value(value.clone()).ok()
}

fn first_text(order: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| order.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_owned)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).single().unwrap_or_default()
    }

    #[test]
    fn test_cart_lines_multiply_price_by_quantity() {
        let order = json!({
            "orderId": "order_N1",
            "name": "Asha",
            "customerEmail": "asha@example.in",
            "phone": "9999999999",
            "cart": [
                {"name": "Kurti", "price": 200, "quantity": 1},
                {"name": "Dupatta", "price": 150, "quantity": 2}
            ]
        });
        let request = InvoiceRequest::from_order(&order, now());
        assert_eq!(
            request.line_items,
            vec![
                LineItem { name: "Kurti".into(), amount: 200, quantity: 1 },
                LineItem { name: "Dupatta".into(), amount: 300, quantity: 2 },
            ]
        );
        assert_eq!(request.line_total(), 500);
        assert_eq!(request.notes.order_id, json!("order_N1"));
        assert_eq!(request.customer.contact, "9999999999");
    }

    #[test]
    fn test_missing_quantity_defaults_to_one_and_rounds() {
        let order = json!({"cart": [{"name": "Saree", "price": "1299.5"}]});
        let request = InvoiceRequest::from_order(&order, now());
        assert_eq!(request.line_items[0].quantity, 1);
        assert_eq!(request.line_items[0].amount, 1300);
    }

    #[test]
    fn test_out_of_range_line_is_clamped() {
        let order = json!({"cart": [
            {"name": "Gold set", "price": "79228162514264337593543950335", "quantity": 2},
            {"name": "Kurti", "price": 200, "quantity": 1}
        ]});
        let request = InvoiceRequest::from_order(&order, now());
        assert_eq!(request.line_items[0].amount, i64::MAX);
        assert_eq!(request.line_items[0].quantity, 2);
        assert_eq!(request.line_total(), i64::MAX);
    }

    #[test]
    fn test_synthetic_line_from_total_cost() {
        let order = json!({"totalCost": 750});
        let request = InvoiceRequest::from_order(&order, now());
        assert_eq!(
            request.line_items,
            vec![LineItem { name: "Order".into(), amount: 750, quantity: 1 }]
        );
    }

    #[test]
    fn test_synthetic_line_falls_back_to_total() {
        let order = json!({"totalCost": 0, "total": 420});
        let request = InvoiceRequest::from_order(&order, now());
        assert_eq!(request.line_total(), 420);
    }

    #[test]
    fn test_customer_fallbacks() {
        let request = InvoiceRequest::from_order(
            &json!({"customerName": "Priya", "email": "p@x.in", "customerPhone": "1"}),
            now(),
        );
        assert_eq!(request.customer.name, "Priya");
        assert_eq!(request.customer.email, "p@x.in");
        assert_eq!(request.customer.contact, "1");

        let request = InvoiceRequest::from_order(&json!({}), now());
        assert_eq!(request.customer.name, "Customer");
        assert_eq!(request.customer.email, "");
        assert_eq!(request.notes.order_id, Value::Null);
    }

    #[test]
    fn test_fixed_fields_and_due_date() {
        let request = InvoiceRequest::from_order(&json!({"id": 17}), now());
        let body = serde_json::to_value(&request).unwrap_or_default();
        assert_eq!(body["type"], "invoice");
        assert_eq!(body["currency"], "INR");
        assert_eq!(body["description"], "Order invoice");
        assert_eq!(body["notes"]["orderId"], 17);
        assert_eq!(request.due_date - request.date, 7 * 24 * 60 * 60);
    }
}
