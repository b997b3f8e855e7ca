//! Client for the external order-management system (Strapi).
//!
//! Only one call is made: marking an order paid once the gateway reports its
//! invoice settled.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use thiserror::Error;
use tracing::instrument;

use crate::config::OrderBackendConfig;

/// Errors from the order-management API.
#[derive(Debug, Error)]
pub enum OrderBackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Order-management API client.
#[derive(Clone)]
pub struct OrderBackendClient {
    inner: Arc<Inner>,
}

struct Inner {
    client: reqwest::Client,
    base_url: String,
    token: Option<SecretString>,
}

impl OrderBackendClient {
    #[must_use]
    pub fn new(client: reqwest::Client, config: &OrderBackendConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_owned(),
                token: config.token.clone(),
            }),
        }
    }

    /// Set an order's payment status to paid and attach the invoice id.
    ///
    /// # Errors
    ///
    /// Returns `OrderBackendError` on transport failure or a non-2xx response.
    #[instrument(skip(self))]
    pub async fn mark_paid(&self, order_id: &str, invoice_id: &str) -> Result<(), OrderBackendError> {
        let url = format!(
            "{}/api/orders/{}",
            self.inner.base_url,
            urlencoding::encode(order_id)
        );
        let mut request = self.inner.client.patch(&url).json(&json!({
            "data": { "paymentStatus": "paid", "invoiceId": invoice_id }
        }));
        if let Some(token) = &self.inner.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OrderBackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(order_id, invoice_id, "Order marked paid in order backend");
        Ok(())
    }
}
