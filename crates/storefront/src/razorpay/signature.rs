//! HMAC-SHA256 signatures used by the payment gateway.
//!
//! Two schemes:
//! - Webhooks: `HMAC(webhook_secret, raw_body)`, accepted as hex or base64.
//! - Checkout payments: `HMAC(key_secret, "<order_id>|<payment_id>")` as hex.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac(secret: &SecretString, message: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()).ok()?;
    mac.update(message);
    Some(mac.finalize().into_bytes().to_vec())
}

/// Verify a webhook signature over the exact raw body bytes.
#[must_use]
pub fn verify_webhook(secret: &SecretString, raw_body: &[u8], signature: &str) -> bool {
    let Some(digest) = mac(secret, raw_body) else {
        return false;
    };
    let signature = signature.trim();
    constant_time_compare(&hex::encode(&digest), signature)
        || constant_time_compare(&STANDARD.encode(&digest), signature)
}

/// Verify the signature returned by the checkout widget for a captured payment.
#[must_use]
pub fn verify_payment(
    key_secret: &SecretString,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    mac(key_secret, format!("{order_id}|{payment_id}").as_bytes())
        .is_some_and(|digest| constant_time_compare(&hex::encode(digest), signature.trim()))
}

/// Hex webhook signature for a body (for senders and tests).
#[must_use]
pub fn sign_hex(secret: &SecretString, body: &[u8]) -> String {
    mac(secret, body).map(hex::encode).unwrap_or_default()
}

/// Base64 webhook signature for a body.
#[must_use]
pub fn sign_base64(secret: &SecretString, body: &[u8]) -> String {
    mac(secret, body)
        .map(|digest| STANDARD.encode(digest))
        .unwrap_or_default()
}

/// Constant-time string comparison to prevent timing attacks.
pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
