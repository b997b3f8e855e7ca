//! Payment classification enums.

use serde::{Deserialize, Serialize};

/// How the customer chose to pay at checkout.
///
/// Browsers send loose identifiers (`"gpay"`, `"credit-card"`, ...); these are
/// folded into a small set of classes. Unknown values are kept verbatim so
/// nothing the customer picked is lost.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    Card,
    Upi,
    NetBanking,
    Wallet,
    Razorpay,
    Paypal,
    CashOnDelivery,
    Other(String),
}

impl PaymentMethod {
    /// Classify a client-supplied payment method string.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace. Both
    /// the raw client identifiers and the canonical labels are accepted.
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        let key = raw.trim().to_lowercase();
        match key.as_str() {
            "credit-card" | "card" | "debit-card" => Self::Card,
            "upi" | "gpay" | "phonepe" => Self::Upi,
            "netbanking" | "net banking" => Self::NetBanking,
            "wallet" => Self::Wallet,
            "razorpay" => Self::Razorpay,
            "paypal" => Self::Paypal,
            "cod" | "cash-on-delivery" | "cash on delivery" => Self::CashOnDelivery,
            _ => Self::Other(raw.trim().to_owned()),
        }
    }

    /// Canonical label stored on order records.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Card => "Card",
            Self::Upi => "UPI",
            Self::NetBanking => "Net Banking",
            Self::Wallet => "Wallet",
            Self::Razorpay => "Razorpay",
            Self::Paypal => "Paypal",
            Self::CashOnDelivery => "Cash on Delivery",
            Self::Other(raw) => raw,
        }
    }

    /// Whether the payment is settled outside the online gateway.
    #[must_use]
    pub const fn is_offline(&self) -> bool {
        matches!(self, Self::CashOnDelivery)
    }
}

impl Serialize for PaymentMethod {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for PaymentMethod {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::classify(&raw))
    }
}

/// Payment state of an order as reported to the order-management system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

impl PaymentStatus {
    /// Wire value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_client_aliases() {
        assert_eq!(PaymentMethod::classify("credit-card"), PaymentMethod::Card);
        assert_eq!(PaymentMethod::classify("GPay"), PaymentMethod::Upi);
        assert_eq!(PaymentMethod::classify(" phonepe "), PaymentMethod::Upi);
        assert_eq!(
            PaymentMethod::classify("netbanking"),
            PaymentMethod::NetBanking
        );
        assert_eq!(
            PaymentMethod::classify("cod"),
            PaymentMethod::CashOnDelivery
        );
    }

    #[test]
    fn test_classify_canonical_labels_roundtrip() {
        for method in [
            PaymentMethod::Card,
            PaymentMethod::Upi,
            PaymentMethod::NetBanking,
            PaymentMethod::Wallet,
            PaymentMethod::Razorpay,
            PaymentMethod::Paypal,
            PaymentMethod::CashOnDelivery,
        ] {
            assert_eq!(PaymentMethod::classify(method.label()), method);
        }
    }

    #[test]
    fn test_unknown_method_kept_verbatim() {
        let method = PaymentMethod::classify("Crypto");
        assert_eq!(method, PaymentMethod::Other("Crypto".to_string()));
        assert_eq!(serde_json::to_string(&method).unwrap(), "\"Crypto\"");
    }

    #[test]
    fn test_cash_on_delivery_is_offline() {
        assert!(PaymentMethod::CashOnDelivery.is_offline());
        assert!(!PaymentMethod::Upi.is_offline());
    }

    #[test]
    fn test_payment_status_wire_value() {
        assert_eq!(PaymentStatus::Paid.as_str(), "paid");
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Paid).unwrap(),
            "\"paid\""
        );
    }
}
