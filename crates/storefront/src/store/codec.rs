//! JSON <-> Firestore typed value encoding.
//!
//! Firestore REST represents every field as a single-key object naming its
//! type (`{"stringValue": "x"}`, `{"integerValue": "42"}`, ...). Integers travel
//! as decimal strings.
//!
//! Strings in the stored timestamp format (see [`kaalika_core::timestamp`])
//! are written as `timestampValue`, so they compare against timestamps the
//! web client wrote with server timestamps. Decoding hands them back as the
//! same RFC 3339 strings.

use kaalika_core::timestamp;
use serde_json::{Map, Value, json};

use super::StoreError;

/// Encode a JSON value as a Firestore `Value`.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => n.as_i64().map_or_else(
            || json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
            |i| json!({ "integerValue": i.to_string() }),
        ),
        Value::String(s) if is_stored_timestamp(s) => json!({ "timestampValue": s }),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

fn is_stored_timestamp(s: &str) -> bool {
    timestamp::parse(s).is_ok_and(|at| timestamp::format(&at) == s)
}

/// Encode a JSON object as a Firestore `fields` map.
pub fn encode_fields(map: &Map<String, Value>) -> Value {
    Value::Object(
        map.iter()
            .map(|(key, value)| (key.clone(), encode_value(value)))
            .collect(),
    )
}

/// Decode a Firestore `Value` into plain JSON.
///
/// # Errors
///
/// Returns `StoreError::Codec` for values without a recognised type key.
pub fn decode_value(value: &Value) -> Result<Value, StoreError> {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Err(StoreError::Codec(format!("untyped value: {value}")));
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| StoreError::Codec(format!("integerValue {s}: {e}"))),
            other => Ok(other.clone()),
        },
        "booleanValue" | "doubleValue" | "stringValue" | "timestampValue" | "referenceValue"
        | "bytesValue" | "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => inner
            .get("values")
            .and_then(Value::as_array)
            .map_or(Ok(Vec::new()), |values| {
                values.iter().map(decode_value).collect()
            })
            .map(Value::Array),
        "mapValue" => decode_fields(inner.get("fields")),
        other => Err(StoreError::Codec(format!("unsupported value type {other}"))),
    }
}

/// Decode a Firestore `fields` map (absent for empty documents).
///
/// # Errors
///
/// Propagates per-field decoding errors.
pub fn decode_fields(fields: Option<&Value>) -> Result<Value, StoreError> {
    let mut out = Map::new();
    if let Some(fields) = fields.and_then(Value::as_object) {
        for (key, value) in fields {
            out.insert(key.clone(), decode_value(value)?);
        }
    }
    Ok(Value::Object(out))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode_value(&json!(42)), json!({"integerValue": "42"}));
        assert_eq!(encode_value(&json!(1.5)), json!({"doubleValue": 1.5}));
        assert_eq!(encode_value(&json!("x")), json!({"stringValue": "x"}));
        assert_eq!(encode_value(&json!(true)), json!({"booleanValue": true}));
        assert_eq!(encode_value(&Value::Null), json!({"nullValue": null}));
    }

    #[test]
    fn test_encode_stored_timestamps_as_timestamp_values() {
        assert_eq!(
            encode_value(&json!("2024-05-01T10:00:00.000Z")),
            json!({"timestampValue": "2024-05-01T10:00:00.000Z"})
        );
        // Other date-like text stays a string.
        assert_eq!(
            encode_value(&json!("2024-05-01T10:00:00Z")),
            json!({"stringValue": "2024-05-01T10:00:00Z"})
        );
        assert_eq!(
            encode_value(&json!("2024-05-01")),
            json!({"stringValue": "2024-05-01"})
        );
    }

    #[test]
    fn test_encode_nested_document() {
        let encoded = encode_value(&json!({"invoice": {"id": "inv_1"}, "tags": [1]}));
        assert_eq!(
            encoded,
            json!({"mapValue": {"fields": {
                "invoice": {"mapValue": {"fields": {"id": {"stringValue": "inv_1"}}}},
                "tags": {"arrayValue": {"values": [{"integerValue": "1"}]}}
            }}})
        );
    }

    #[test]
    fn test_decode_document_from_rest_response() {
        let fields = json!({
            "total": {"integerValue": "500"},
            "date": {"timestampValue": "2024-05-01T10:00:00Z"},
            "items": {"arrayValue": {}},
            "customer": {"mapValue": {}}
        });
        let decoded = decode_fields(Some(&fields)).unwrap();
        assert_eq!(
            decoded,
            json!({
                "total": 500,
                "date": "2024-05-01T10:00:00Z",
                "items": [],
                "customer": {}
            })
        );
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        assert!(decode_value(&json!({"mysteryValue": 1})).is_err());
        assert!(decode_value(&json!("bare")).is_err());
    }
}
