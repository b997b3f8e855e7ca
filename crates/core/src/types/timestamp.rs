//! Fixed-width timestamp encoding for stored documents.
//!
//! Documents carry timestamps as RFC 3339 UTC strings with exactly three
//! fractional digits (`2024-05-01T10:00:00.000Z`). The fixed width makes
//! string order equal to time order, which the document store relies on for
//! `>=` filters and `createdAt` ordering.
//!
//! Use with `#[serde(with = "kaalika_core::timestamp")]`, or
//! `kaalika_core::timestamp::option` for optional fields.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Render a timestamp in the stored format.
#[must_use]
pub fn format(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse any RFC 3339 timestamp into UTC.
///
/// # Errors
///
/// Returns the chrono parse error for malformed input.
pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// Serialize in the stored format.
///
/// # Errors
///
/// Propagates serializer errors.
pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(at))
}

/// Deserialize from any RFC 3339 string.
///
/// # Errors
///
/// Fails on non-string or malformed input.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(serde::de::Error::custom)
}

/// The same encoding for `Option<DateTime<Utc>>` fields.
pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize `Some` in the stored format and `None` as null.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(
        at: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match at {
            Some(at) => serializer.serialize_some(&super::format(at)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional RFC 3339 string.
    ///
    /// # Errors
    ///
    /// Fails on malformed input.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| super::parse(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_format_is_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let later = whole + chrono::Duration::milliseconds(500);
        assert_eq!(format(&whole), "2024-05-01T10:00:00.000Z");
        assert_eq!(format(&later), "2024-05-01T10:00:00.500Z");
        assert!(format(&whole) < format(&later));
    }

    #[test]
    fn test_parse_accepts_offsets() {
        let parsed = parse("2024-05-01T15:30:00+05:30").unwrap();
        assert_eq!(format(&parsed), "2024-05-01T10:00:00.000Z");
    }
}
