//! User profile documents.

use serde::{Deserialize, Serialize};

use super::email::Email;

/// Name shown when neither the profile nor the identity token carries one.
pub const PLACEHOLDER_NAME: &str = "Unknown User";

/// A user's profile document, keyed by identity-provider subject.
///
/// `order_history` and `invoices` only ever grow. Their entries are kept as
/// stored: they are denormalized copies written at checkout time and may
/// predate the current [`Order`](super::order::Order) shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub order_history: Vec<serde_json::Value>,
    #[serde(default)]
    pub invoices: Vec<serde_json::Value>,
}

impl UserProfile {
    /// Whether the stored name is absent, blank or the placeholder.
    #[must_use]
    pub fn name_missing(&self) -> bool {
        self.name
            .as_deref()
            .is_none_or(|name| name.trim().is_empty() || name == PLACEHOLDER_NAME)
    }

    /// Whether the stored email is absent or blank.
    #[must_use]
    pub fn email_missing(&self) -> bool {
        self.email.as_deref().is_none_or(|email| email.trim().is_empty())
    }
}

/// Pick a display name: the explicit name, else the email's local part,
/// else [`PLACEHOLDER_NAME`].
#[must_use]
pub fn display_name(name: Option<&str>, email: Option<&str>) -> String {
    if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_owned();
    }
    email
        .and_then(|e| Email::parse(e).ok())
        .map_or_else(|| PLACEHOLDER_NAME.to_owned(), |e| e.local_part().to_owned())
}
