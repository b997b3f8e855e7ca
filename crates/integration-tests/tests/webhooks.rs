//! Razorpay webhook reconciliation tests.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::http::StatusCode;
use chrono::Utc;
use kaalika_core::Notification;
use kaalika_integration_tests::{
    TestConfig, TestContext, WEBHOOK_SECRET, invoice_event, sign_webhook,
};
use kaalika_storefront::db::ADMIN_NOTIFICATIONS;
use kaalika_storefront::razorpay::signature;
use kaalika_storefront::services::reconcile::verify_webhook_request;
use kaalika_storefront::store::DocumentStore;
use proptest::prelude::*;
use secrecy::SecretString;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

async fn seed_issued(ctx: &TestContext, id: &str, invoice_id: &str) {
    let mut note = Notification::new(json!({"orderId": id}), Utc::now(), true);
    note.invoice = Some(json!({"id": invoice_id, "short_url": "https://rzp.io/i/x"}));
    ctx.store
        .set(ADMIN_NOTIFICATIONS, id, serde_json::to_value(note).unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unconfigured_secret_outside_test_mode_is_server_error() {
    let ctx = TestContext::start(TestConfig {
        webhook_secret: false,
        ..TestConfig::default()
    })
    .await;

    let body = invoice_event("invoice.paid", "inv_1", json!({})).to_string();
    let response = ctx.post_webhook(body.as_bytes(), None).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json(), json!({"error": "Webhook not configured"}));
    assert!(ctx.notifications().await.is_empty());
}

#[tokio::test]
async fn test_bad_signature_is_rejected_without_writes() {
    let ctx = TestContext::new().await;
    let body = invoice_event("invoice.paid", "inv_1", json!({})).to_string();

    let forged = ctx.post_webhook(body.as_bytes(), Some("deadbeef")).await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);

    let unsigned = ctx.post_webhook(body.as_bytes(), None).await;
    assert_eq!(unsigned.status, StatusCode::UNAUTHORIZED);

    assert!(ctx.notifications().await.is_empty());
}

#[tokio::test]
async fn test_base64_signature_is_accepted() {
    let ctx = TestContext::new().await;
    let body = invoice_event("invoice.issued", "inv_b64", json!({})).to_string();
    let sig = signature::sign_base64(&SecretString::from(WEBHOOK_SECRET), body.as_bytes());

    let response = ctx.post_webhook(body.as_bytes(), Some(&sig)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({"ok": true}));
    assert_eq!(ctx.notifications().await.len(), 1);
}

#[tokio::test]
async fn test_paid_event_updates_exactly_the_matching_notification() {
    let ctx = TestContext::new().await;
    seed_issued(&ctx, "match", "inv_1").await;
    seed_issued(&ctx, "other", "inv_2").await;

    let response = ctx
        .post_signed_webhook(&invoice_event("invoice.paid", "inv_1", json!({})))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({"ok": true}));

    let matched = ctx.store.get(ADMIN_NOTIFICATIONS, "match").await.unwrap().unwrap();
    assert_eq!(matched["paid"], true);
    assert_eq!(matched["seen"], true);
    assert!(matched["paidAt"].is_string());
    assert_eq!(matched["invoice"]["status"], "paid");
    assert_eq!(matched["payload"]["orderId"], "match");

    let other = ctx.store.get(ADMIN_NOTIFICATIONS, "other").await.unwrap().unwrap();
    assert!(other.get("paid").is_none());
    assert_eq!(other["invoice"]["id"], "inv_2");

    assert_eq!(ctx.notifications().await.len(), 2);
}

#[tokio::test]
async fn test_unmatched_paid_event_creates_one_notification() {
    let ctx = TestContext::new().await;
    let event = invoice_event("invoice.paid", "inv_new", json!({}));

    ctx.post_signed_webhook(&event).await;

    let notes = ctx.notifications().await;
    assert_eq!(notes.len(), 1);
    let created = &notes[0].data;
    assert_eq!(created["payload"]["invoiceEvent"], "invoice.paid");
    assert_eq!(created["payload"]["invoice"]["id"], "inv_new");
    assert_eq!(created["invoice"]["id"], "inv_new");
    assert_eq!(created["seen"], true);
    assert_eq!(created["paid"], true);
    assert!(created["paidAt"].is_string());
    assert!(created["createdAt"].is_string());
}

#[tokio::test]
async fn test_unmatched_issued_event_creates_unseen_notification() {
    let ctx = TestContext::new().await;

    ctx.post_signed_webhook(&invoice_event("invoice.issued", "inv_i", json!({})))
        .await;

    let notes = ctx.notifications().await;
    assert_eq!(notes.len(), 1);
    let created = &notes[0].data;
    assert_eq!(created["seen"], false);
    assert!(created["issuedAt"].is_string());
    assert!(created.get("paid").is_none());
}

#[tokio::test]
async fn test_issued_event_stamps_matching_notification() {
    let ctx = TestContext::new().await;
    seed_issued(&ctx, "n1", "inv_9").await;

    ctx.post_signed_webhook(&invoice_event("invoice.issued", "inv_9", json!({})))
        .await;

    let stored = ctx.store.get(ADMIN_NOTIFICATIONS, "n1").await.unwrap().unwrap();
    assert!(stored["issuedAt"].is_string());
    assert!(stored.get("paid").is_none());
    assert_eq!(ctx.notifications().await.len(), 1);
}

#[tokio::test]
async fn test_non_invoice_events_are_acknowledged_and_ignored() {
    let ctx = TestContext::new().await;
    let event = json!({"event": "payment.captured", "payload": {"payment": {"entity": {"id": "pay_1"}}}});

    let response = ctx.post_signed_webhook(&event).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({"ok": true}));
    assert!(ctx.notifications().await.is_empty());
}

#[tokio::test]
async fn test_test_mode_accepts_unsigned_and_snapshots_parse_errors() {
    let ctx = TestContext::start(TestConfig {
        webhook_secret: false,
        test_mode: true,
        ..TestConfig::default()
    })
    .await;

    let accepted = ctx
        .post_webhook(
            invoice_event("invoice.issued", "inv_t", json!({})).to_string().as_bytes(),
            None,
        )
        .await;
    assert_eq!(accepted.status, StatusCode::OK);
    assert_eq!(ctx.notifications().await.len(), 1);

    let garbage = ctx.post_webhook(b"{not json", None).await;
    assert_eq!(garbage.status, StatusCode::OK);
    assert_eq!(garbage.json(), json!({"ok": true}));

    let snapshots: Vec<Value> = std::fs::read_dir(ctx.snapshots.path())
        .unwrap()
        .map(|entry| {
            let raw = std::fs::read_to_string(entry.unwrap().path()).unwrap();
            serde_json::from_str(&raw).unwrap()
        })
        .collect();
    assert!(snapshots.iter().any(|s| s["event"] == "parse-error"));
}

#[tokio::test]
async fn test_store_outage_is_acknowledged_and_snapshotted() {
    let ctx = TestContext::start(TestConfig {
        test_mode: true,
        ..TestConfig::default()
    })
    .await;
    ctx.store.fail_collection(ADMIN_NOTIFICATIONS).await;

    let response = ctx
        .post_signed_webhook(&invoice_event("invoice.paid", "inv_down", json!({})))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({"ok": true}));
    assert!(ctx.notifications().await.is_empty());
    let snapshots: Vec<Value> = std::fs::read_dir(ctx.snapshots.path())
        .unwrap()
        .map(|entry| serde_json::from_slice(&std::fs::read(entry.unwrap().path()).unwrap()).unwrap())
        .collect();
    assert!(
        snapshots
            .iter()
            .any(|s| s["invoiceId"] == "inv_down" && s["data"]["err"].is_string())
    );
}

#[tokio::test]
async fn test_paid_event_patches_order_backend() {
    let ctx = TestContext::start(TestConfig {
        order_backend: true,
        ..TestConfig::default()
    })
    .await;
    let backend = ctx.order_backend.as_ref().unwrap();
    Mock::given(method("PATCH"))
        .and(path("/api/orders/77"))
        .and(header("authorization", "Bearer strapi-token"))
        .and(body_json(json!({
            "data": {"paymentStatus": "paid", "invoiceId": "inv_77"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .expect(1)
        .mount(backend)
        .await;

    let response = ctx
        .post_signed_webhook(&invoice_event(
            "invoice.paid",
            "inv_77",
            json!({"orderId": "77"}),
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    // The patch runs in the background.
    for _ in 0..100 {
        if !backend.received_requests().await.unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(backend.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_issued_event_does_not_patch_order_backend() {
    let ctx = TestContext::start(TestConfig {
        order_backend: true,
        ..TestConfig::default()
    })
    .await;

    ctx.post_signed_webhook(&invoice_event(
        "invoice.issued",
        "inv_77",
        json!({"orderId": "77"}),
    ))
    .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let backend = ctx.order_backend.as_ref().unwrap();
    assert!(backend.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_signature_covers_exact_bytes() {
    let ctx = TestContext::new().await;
    let body = invoice_event("invoice.paid", "inv_1", json!({})).to_string();
    let sig = sign_webhook(body.as_bytes());
    let reformatted = serde_json::to_string_pretty(&serde_json::from_str::<Value>(&body).unwrap())
        .unwrap();

    let response = ctx.post_webhook(reformatted.as_bytes(), Some(&sig)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

proptest! {
    #[test]
    fn prop_single_byte_mutation_fails_verification(
        body in proptest::collection::vec(any::<u8>(), 1..256),
        index in any::<prop::sample::Index>(),
        flip in 1u8..=255,
    ) {
        let secret = SecretString::from(WEBHOOK_SECRET);
        let sig = signature::sign_hex(&secret, &body);
        prop_assert!(verify_webhook_request(Some(&secret), false, &body, Some(&sig)).is_ok());

        let mut mutated = body;
        let i = index.index(mutated.len());
        mutated[i] ^= flip;
        prop_assert!(verify_webhook_request(Some(&secret), false, &mutated, Some(&sig)).is_err());
    }
}
