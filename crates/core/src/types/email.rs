//! Customer email addresses as they arrive from checkout forms and identity
//! token claims.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why a string was not accepted as an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email is blank")]
    Blank,
    #[error("email is longer than {max} characters")]
    TooLong { max: usize },
    /// Not exactly one `@` with text on both sides.
    #[error("email is not of the form local@domain")]
    Malformed,
}

/// A trimmed address with a non-empty mailbox and domain.
///
/// Only the shape is checked. Storefront customers type these by hand and
/// the payment gateway does its own validation on invoice customers.
///
/// ```
/// use kaalika_core::Email;
///
/// let email = Email::parse("  priya.k@Example.IN ").unwrap();
/// assert_eq!(email.as_str(), "priya.k@example.in");
/// assert_eq!(email.local_part(), "priya.k");
/// assert!(Email::parse("priya.k").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email {
    address: String,
    at: usize,
}

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LENGTH: usize = 254;

    /// Trim, check shape and lowercase the domain.
    ///
    /// # Errors
    ///
    /// Returns `EmailError` for blank, overlong or malformed input.
    pub fn parse(raw: &str) -> Result<Self, EmailError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(EmailError::Blank);
        }
        if raw.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let (local, domain) = raw.split_once('@').ok_or(EmailError::Malformed)?;
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(EmailError::Malformed);
        }

        Ok(Self {
            address: format!("{local}@{}", domain.to_ascii_lowercase()),
            at: local.len(),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.address
    }

    /// The mailbox name, used as a fallback display name.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.address.get(..self.at).unwrap_or_default()
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        self.address.get(self.at + 1..).unwrap_or_default()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.address
    }
}
