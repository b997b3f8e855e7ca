//! Newtype IDs for type-safe document references.
//!
//! Every identifier in this system is a string: document-store ids, gateway
//! invoice ids and identity-provider subjects are all opaque text. Use the
//! `define_id!` macro to create wrappers that prevent accidentally mixing
//! them up.

use chrono::{DateTime, Utc};

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use kaalika_core::define_id;
/// define_id!(CustomerId);
/// define_id!(ShipmentId);
///
/// let customer = CustomerId::new("c-1");
/// let shipment = ShipmentId::new("c-1");
///
/// // These are different types, so this won't compile:
/// // let _: CustomerId = shipment;
/// assert_eq!(customer.as_str(), shipment.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(OrderId);
define_id!(NotificationId);
define_id!(InvoiceId);
define_id!(UserUid);

impl OrderId {
    /// Derive an order ID from a placement time (milliseconds since the epoch).
    #[must_use]
    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        Self(at.timestamp_millis().to_string())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_order_id_from_timestamp_uses_millis() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).single();
        let id = OrderId::from_timestamp(at.unwrap_or_default());
        assert_eq!(id.as_str(), "1700000000123");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = InvoiceId::new("inv_123");
        assert_eq!(
            serde_json::to_value(&id).ok(),
            Some(serde_json::json!("inv_123"))
        );
    }

    #[test]
    fn test_id_display() {
        assert_eq!(NotificationId::from("abc").to_string(), "abc");
    }
}
