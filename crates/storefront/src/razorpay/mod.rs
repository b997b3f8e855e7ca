//! Razorpay REST API client.
//!
//! Covers the three calls the storefront makes: creating checkout orders,
//! creating invoices and downloading invoice PDFs. All use HTTP basic auth
//! with the key id and key secret.

mod invoice;
pub mod signature;

use std::sync::Arc;

use axum::body::Bytes;
use kaalika_core::CurrencyCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

pub use invoice::{
    INVOICE_DUE_DAYS, Invoice, InvoiceCustomer, InvoiceNotes, InvoiceRequest, LineItem,
};

use crate::config::RazorpayConfig;

/// Errors from the Razorpay API.
#[derive(Debug, Error)]
pub enum RazorpayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status. `body` is the raw response text.
    #[error("Razorpay API error: {status} - {body}")]
    Api { status: u16, body: String },
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateOrderRequest {
    /// Minor currency units (paise).
    pub amount: i64,
    pub currency: CurrencyCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
}

/// A gateway order as returned by `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// A downloaded invoice document.
#[derive(Debug, Clone)]
pub struct InvoicePdf {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

/// Razorpay API client.
#[derive(Clone)]
pub struct RazorpayClient {
    inner: Arc<RazorpayClientInner>,
}

struct RazorpayClientInner {
    client: reqwest::Client,
    key_id: String,
    key_secret: SecretString,
    api_base: String,
}

impl RazorpayClient {
    /// Create a client, or `None` when the key pair is not configured.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &RazorpayConfig) -> Option<Self> {
        let (key_id, key_secret) = config.credentials()?;
        Some(Self {
            inner: Arc::new(RazorpayClientInner {
                client,
                key_id: key_id.to_owned(),
                key_secret: key_secret.clone(),
                api_base: config.api_base.as_str().trim_end_matches('/').to_owned(),
            }),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.inner
            .client
            .request(method, format!("{}{path}", self.inner.api_base))
            .basic_auth(
                &self.inner.key_id,
                Some(self.inner.key_secret.expose_secret()),
            )
    }

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, RazorpayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(RazorpayError::Api {
            status: status.as_u16(),
            body,
        })
    }

    /// Create a checkout order.
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError` on transport failure or a non-2xx response.
    #[instrument(skip(self), fields(amount = request.amount))]
    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<GatewayOrder, RazorpayError> {
        let response = self
            .request(reqwest::Method::POST, "/orders")
            .json(request)
            .send()
            .await?;
        Ok(Self::ensure_success(response).await?.json().await?)
    }

    /// Create an invoice. Not idempotent: each call creates a new invoice.
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError` on transport failure or a non-2xx response.
    #[instrument(skip(self, request), fields(line_items = request.line_items.len()))]
    pub async fn create_invoice(&self, request: &InvoiceRequest) -> Result<Invoice, RazorpayError> {
        let response = self
            .request(reqwest::Method::POST, "/invoices")
            .json(request)
            .send()
            .await?;
        let invoice: Invoice = Self::ensure_success(response).await?.json().await?;
        tracing::info!(invoice_id = %invoice.id, "Razorpay invoice created");
        Ok(invoice)
    }

    /// Download an invoice PDF.
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError` on transport failure or a non-2xx response.
    #[instrument(skip(self))]
    pub async fn invoice_pdf(&self, invoice_id: &str) -> Result<InvoicePdf, RazorpayError> {
        let path = format!("/invoices/{}/pdf", urlencoding::encode(invoice_id));
        let response = self.request(reqwest::Method::GET, &path).send().await?;
        let response = Self::ensure_success(response).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        Ok(InvoicePdf {
            bytes: response.bytes().await?,
            content_type,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{basic_auth, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn client() -> (MockServer, RazorpayClient) {
        let server = MockServer::start().await;
        let config = RazorpayConfig {
            key_id: Some("rzp_test_key".to_string()),
            key_secret: Some(SecretString::from("rzp_test_secret")),
            webhook_secret: None,
            api_base: url::Url::parse(&server.uri()).unwrap(),
        };
        let client = RazorpayClient::new(reqwest::Client::new(), &config).unwrap();
        (server, client)
    }

    #[test]
    fn test_new_requires_key_pair() {
        let config = RazorpayConfig {
            key_id: Some("rzp_test_key".to_string()),
            ..RazorpayConfig::default()
        };
        assert!(RazorpayClient::new(reqwest::Client::new(), &config).is_none());
    }

    #[tokio::test]
    async fn test_create_order() {
        let (server, client) = client().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .and(basic_auth("rzp_test_key", "rzp_test_secret"))
            .and(body_partial_json(json!({"amount": 50000, "currency": "INR"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "order_N1", "amount": 50000, "currency": "INR", "status": "created"
            })))
            .mount(&server)
            .await;

        let order = client
            .create_order(&CreateOrderRequest {
                amount: 50000,
                currency: CurrencyCode::INR,
                receipt: None,
            })
            .await
            .unwrap();
        assert_eq!(order.id, "order_N1");
        assert_eq!(order.status.as_deref(), Some("created"));
    }

    #[tokio::test]
    async fn test_create_invoice_error_keeps_body() {
        let (server, client) = client().await;
        Mock::given(method("POST"))
            .and(path("/invoices"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": "BAD_REQUEST_ERROR", "description": "customer email invalid"}
            })))
            .mount(&server)
            .await;

        let request = InvoiceRequest::from_order(&json!({"totalCost": 100}), chrono::Utc::now());
        let err = client.create_invoice(&request).await.unwrap_err();
        match err {
            RazorpayError::Api { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("customer email invalid"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_invoice_pdf_returns_bytes() {
        let (server, client) = client().await;
        Mock::given(method("GET"))
            .and(path("/invoices/inv_1/pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(b"%PDF-1.4 test".to_vec()),
            )
            .mount(&server)
            .await;

        let pdf = client.invoice_pdf("inv_1").await.unwrap();
        assert_eq!(&pdf.bytes[..], b"%PDF-1.4 test");
        assert_eq!(pdf.content_type.as_deref(), Some("application/pdf"));
    }
}
