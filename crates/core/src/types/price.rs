//! Money amounts using decimal arithmetic.
//!
//! Amounts travel over the wire as plain JSON numbers (the browser cart and
//! the gateway both speak numbers), but all arithmetic is done on
//! [`Decimal`] so that `price × quantity` sums never drift.

use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A money amount in the currency's standard unit (rupees, not paise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a decimal value.
    #[must_use]
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Create an amount from a whole number of units.
    #[must_use]
    pub fn from_units(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// Create an amount from a float, as sent by JavaScript clients.
    ///
    /// Returns `None` for NaN or infinite values.
    #[must_use]
    pub fn from_f64(value: f64) -> Option<Self> {
        Decimal::from_f64(value).map(Self)
    }

    /// Get the underlying decimal.
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Round half away from zero to a whole number of units.
    ///
    /// Saturates at `i64` bounds.
    #[must_use]
    pub fn round_units(&self) -> i64 {
        let rounded = self
            .0
            .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
        rounded.to_i64().unwrap_or(if rounded.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        })
    }

    /// Convert to the currency's minor unit (paise), rounded.
    ///
    /// Saturates at `i64` bounds.
    #[must_use]
    pub fn to_minor_units(&self) -> i64 {
        self.0
            .checked_mul(Decimal::ONE_HUNDRED)
            .map_or_else(|| self.saturated(), |minor| Self(minor).round_units())
    }

    /// `self + rhs`, or `None` past the decimal range.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// `self × quantity`, or `None` past the decimal range.
    #[must_use]
    pub fn checked_mul(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(quantity)).map(Self)
    }

    /// `self × quantity`, clamped to the decimal range.
    #[must_use]
    pub fn saturating_mul(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }

    /// Sum of the given amounts, or `None` past the decimal range.
    #[must_use]
    pub fn checked_sum(amounts: impl IntoIterator<Item = Self>) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |total, amount| total.checked_add(amount))
    }

    fn saturated(&self) -> i64 {
        if self.is_negative() { i64::MIN } else { i64::MAX }
    }

    /// Whether the amount is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Whole amounts stay integers on the wire so clients comparing with
        // `===` see 500, not 500.0.
        if self.0.fract().is_zero()
            && let Some(units) = self.0.to_i64()
        {
            return serializer.serialize_i64(units);
        }
        match self.0.to_f64() {
            Some(value) => serializer.serialize_f64(value),
            None => serializer.serialize_str(&self.0.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Float(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(units) => Ok(Self::from_units(units)),
            Raw::Float(value) => Self::from_f64(value)
                .ok_or_else(|| serde::de::Error::custom("amount is not a finite number")),
            Raw::Text(text) => text
                .trim()
                .parse::<Decimal>()
                .map(Self)
                .map_err(|e| serde::de::Error::custom(format!("invalid amount: {e}"))),
        }
    }
}

/// ISO 4217 currency codes accepted by the payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
}

impl CurrencyCode {
    /// The ISO code as sent to the gateway.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
        }
    }
}
