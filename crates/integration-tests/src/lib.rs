//! Integration tests for the Kaalika storefront.
//!
//! Every test drives the real router in-process. Firebase is replaced by an
//! in-memory document store plus a fake token verifier; Razorpay and the
//! order backend are `wiremock` servers.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p kaalika-integration-tests
//! ```
//!
//! # Identity tokens
//!
//! [`FakeVerifier`] accepts `token-<uid>` and resolves it to `<uid>` with the
//! email `<uid>@example.in`. Anything else is rejected.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use kaalika_core::UserUid;
use kaalika_storefront::config::{
    DiagnosticsConfig, FirebaseConfig, OrderBackendConfig, RazorpayConfig, StorefrontConfig,
};
use kaalika_storefront::db::ADMIN_NOTIFICATIONS;
use kaalika_storefront::firebase::{
    FirebaseAdmin, IdentityError, IdentityVerifier, VerifiedIdentity,
};
use kaalika_storefront::razorpay::signature;
use kaalika_storefront::routes::webhooks::SIGNATURE_HEADER;
use kaalika_storefront::state::AppState;
use kaalika_storefront::store::{Document, DocumentStore, MemoryStore};
use secrecy::SecretString;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::MockServer;

pub const ADMIN_SECRET: &str = "console-secret-for-integration-tests";
pub const KEY_ID: &str = "rzp_test_key";
pub const KEY_SECRET: &str = "rzp_test_secret";
pub const WEBHOOK_SECRET: &str = "whsec_integration";

/// Token verifier that trusts `token-<uid>`.
pub struct FakeVerifier;

#[async_trait]
impl IdentityVerifier for FakeVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let uid = token
            .strip_prefix("token-")
            .filter(|uid| !uid.is_empty())
            .ok_or(IdentityError::MissingSubject)?;
        Ok(VerifiedIdentity {
            uid: UserUid::new(uid),
            email: Some(format!("{uid}@example.in")),
            name: None,
        })
    }
}

/// Bearer token the fake verifier resolves to `uid`.
#[must_use]
pub fn token_for(uid: &str) -> String {
    format!("token-{uid}")
}

/// Knobs for [`TestContext::start`].
#[derive(Debug, Clone, Copy)]
pub struct TestConfig {
    pub firebase: bool,
    pub webhook_secret: bool,
    pub test_mode: bool,
    pub order_backend: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            firebase: true,
            webhook_secret: true,
            test_mode: false,
            order_backend: false,
        }
    }
}

/// A storefront wired to in-memory and mocked backends.
pub struct TestContext {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub gateway: MockServer,
    pub order_backend: Option<MockServer>,
    pub snapshots: TempDir,
}

impl TestContext {
    /// A fully configured storefront.
    pub async fn new() -> Self {
        Self::start(TestConfig::default()).await
    }

    pub async fn start(options: TestConfig) -> Self {
        let gateway = MockServer::start().await;
        let order_backend = if options.order_backend {
            Some(MockServer::start().await)
        } else {
            None
        };
        let snapshots = tempfile::tempdir().unwrap();

        let config = StorefrontConfig {
            admin_secret: Some(SecretString::from(ADMIN_SECRET)),
            razorpay: RazorpayConfig {
                key_id: Some(KEY_ID.to_string()),
                key_secret: Some(SecretString::from(KEY_SECRET)),
                webhook_secret: options
                    .webhook_secret
                    .then(|| SecretString::from(WEBHOOK_SECRET)),
                api_base: url::Url::parse(&gateway.uri()).unwrap(),
            },
            order_backend: order_backend.as_ref().map(|server| OrderBackendConfig {
                base_url: url::Url::parse(&server.uri()).unwrap(),
                token: Some(SecretString::from("strapi-token")),
            }),
            diagnostics: DiagnosticsConfig {
                test_mode: options.test_mode,
                snapshot_dir: snapshots.path().to_path_buf(),
            },
            ..StorefrontConfig::default()
        };

        let store = Arc::new(MemoryStore::new());
        let http = reqwest::Client::new();
        let firebase = if options.firebase {
            FirebaseAdmin::with_backends(
                store.clone() as Arc<dyn DocumentStore>,
                Arc::new(FakeVerifier),
            )
        } else {
            FirebaseAdmin::new(FirebaseConfig::default(), http.clone())
        };
        let app = kaalika_storefront::app(AppState::from_parts(config, firebase, http));

        Self {
            app,
            store,
            gateway,
            order_backend,
            snapshots,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, bearer: Option<&str>) -> TestResponse {
        self.send(request(Method::GET, uri, bearer, None, Body::empty()))
            .await
    }

    pub async fn post_json(&self, uri: &str, bearer: Option<&str>, body: &Value) -> TestResponse {
        self.send(request(
            Method::POST,
            uri,
            bearer,
            Some("application/json"),
            Body::from(body.to_string()),
        ))
        .await
    }

    /// POST raw webhook bytes with an optional signature header.
    pub async fn post_webhook(&self, body: &[u8], signature: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/webhooks/razorpay")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        self.send(builder.body(Body::from(body.to_vec())).unwrap())
            .await
    }

    /// POST a webhook signed with the configured secret.
    pub async fn post_signed_webhook(&self, event: &Value) -> TestResponse {
        let body = event.to_string();
        let sig = sign_webhook(body.as_bytes());
        self.post_webhook(body.as_bytes(), Some(&sig)).await
    }

    /// Every stored admin notification.
    pub async fn notifications(&self) -> Vec<Document> {
        self.store.documents(ADMIN_NOTIFICATIONS).await
    }

    /// Poll until at least `count` notifications exist.
    ///
    /// Checkout writes its notification in the background.
    pub async fn wait_for_notifications(&self, count: usize) -> Vec<Document> {
        for _ in 0..100 {
            let found = self.notifications().await;
            if found.len() >= count {
                return found;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {count} notifications");
    }
}

fn request(
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    content_type: Option<&str>,
    body: Body,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(body).unwrap()
}

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Hex HMAC of a webhook body under the test secret.
#[must_use]
pub fn sign_webhook(body: &[u8]) -> String {
    signature::sign_hex(&SecretString::from(WEBHOOK_SECRET), body)
}

/// Checkout signature for a gateway order/payment pair.
#[must_use]
pub fn sign_payment(order_id: &str, payment_id: &str) -> String {
    signature::sign_hex(
        &SecretString::from(KEY_SECRET),
        format!("{order_id}|{payment_id}").as_bytes(),
    )
}

/// A gateway invoice event body.
#[must_use]
pub fn invoice_event(event: &str, invoice_id: &str, notes: Value) -> Value {
    json!({
        "entity": "event",
        "event": event,
        "payload": {
            "invoice": {
                "entity": {
                    "id": invoice_id,
                    "entity": "invoice",
                    "status": if event == "invoice.paid" { "paid" } else { "issued" },
                    "short_url": format!("https://rzp.io/i/{invoice_id}"),
                    "notes": notes,
                }
            }
        }
    })
}

/// Two lines totalling 500.
#[must_use]
pub fn sample_cart() -> Value {
    json!([
        {"id": 1, "name": "Kurti", "price": 200, "quantity": 1},
        {"id": "p2", "name": "Dupatta", "price": 150, "quantity": 2, "size": "M"}
    ])
}
