//! Health report and Firebase initialization tests.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use kaalika_integration_tests::{TestConfig, TestContext};
use kaalika_storefront::config::{FirebaseConfig, StorefrontConfig};
use kaalika_storefront::state::AppState;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

const TEST_KEY: &str = include_str!("../../storefront/testdata/rsa_test_key.pem");

fn firebase_config() -> FirebaseConfig {
    FirebaseConfig {
        project_id: Some("kaalika-test".to_string()),
        client_email: Some("svc@kaalika-test.iam.gserviceaccount.com".to_string()),
        private_key: Some(SecretString::from(TEST_KEY.replace('\n', "\\n"))),
        ..FirebaseConfig::default()
    }
}

#[tokio::test]
async fn test_health_reports_presence_only() {
    let ctx = TestContext::start(TestConfig {
        firebase: false,
        ..TestConfig::default()
    })
    .await;

    let response = ctx.get("/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["ok"], true);
    assert!(body["time"].as_str().unwrap().ends_with('Z'));
    assert_eq!(body["firebase"]["configured"], false);
    assert_eq!(body["firebase"]["privateKeyPresent"], false);
    assert_eq!(body["razorpay"]["keysPresent"], true);
    assert_eq!(body["razorpay"]["webhookSecretPresent"], true);
    assert_eq!(body["adminSecretPresent"], true);
    assert_eq!(body["orderBackendConfigured"], false);
    assert!(body["note"].as_str().unwrap().contains("does not attempt"));
}

#[tokio::test]
async fn test_health_reports_firebase_key_format() {
    let config = StorefrontConfig {
        firebase: firebase_config(),
        ..StorefrontConfig::default()
    };
    let app = kaalika_storefront::app(AppState::new(config).unwrap());

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["firebase"]["configured"], true);
    assert_eq!(body["firebase"]["projectId"], "kaalika-test");
    assert_eq!(body["firebase"]["privateKeyLooksEscaped"], true);
    assert_eq!(body["firebase"]["privateKeyLooksPEM"], true);
    assert_eq!(body["razorpay"]["keysPresent"], false);
}

#[tokio::test]
async fn test_configured_firebase_initializes_once() {
    let config = StorefrontConfig {
        firebase: firebase_config(),
        ..StorefrontConfig::default()
    };
    let state = AppState::new(config).unwrap();

    let first = state.firebase();
    let second = state.firebase();

    assert!(first.ready && second.ready);
    assert!(Arc::ptr_eq(
        first.store.as_ref().unwrap(),
        second.store.as_ref().unwrap()
    ));
    assert!(state.identity().is_some());
}

#[tokio::test]
async fn test_unconfigured_firebase_is_not_ready() {
    let state = AppState::new(StorefrontConfig::default()).unwrap();
    let handle = state.firebase();
    assert!(!handle.ready);
    assert!(state.store().is_none());
    assert!(state.razorpay().is_none());
}
