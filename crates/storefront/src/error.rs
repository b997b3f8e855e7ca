//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`;
//! every error body is JSON: `{"error": "..."}`, plus `detail` for upstream
//! failures.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::razorpay::RazorpayError;
use crate::store::StoreError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or invalid bearer token, or admin secret mismatch.
    #[error("Unauthorized")]
    Unauthorized,

    /// A required external integration is not configured.
    #[error("{0}")]
    Misconfigured(String),

    /// Referenced resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// A third party answered with a failure.
    #[error("{message}")]
    Upstream { message: String, detail: Value },

    /// Webhook HMAC mismatch.
    #[error("Invalid signature")]
    SignatureInvalid,

    /// Endpoint permanently retired.
    #[error("{0}")]
    Gone(String),

    /// Document store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error. The message is logged, not returned.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// An upstream failure from a gateway error, keeping its body as detail.
    #[must_use]
    pub fn upstream(message: &str, err: RazorpayError) -> Self {
        let detail = match err {
            RazorpayError::Api { body, .. } => {
                serde_json::from_str(&body).unwrap_or(Value::String(body))
            }
            RazorpayError::Http(e) => Value::String(e.to_string()),
        };
        Self::Upstream {
            message: message.to_owned(),
            detail,
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::SignatureInvalid => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Gone(_) => StatusCode::GONE,
            Self::Misconfigured(_) | Self::Store(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let body = match self {
            Self::Store(_) | Self::Internal(_) => json!({ "error": "Internal server error" }),
            Self::Upstream { message, detail } => json!({ "error": message, "detail": detail }),
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(get_status(AppError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            get_status(AppError::SignatureInvalid),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::NotFound("Order not found".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Misconfigured("Firebase not configured".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(get_status(AppError::Gone("x".into())), StatusCode::GONE);
        assert_eq!(
            get_status(AppError::Internal("test".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_misconfigured_message_is_returned() {
        let (status, body) = body_json(AppError::Misconfigured(
            "Webhook not configured".to_string(),
        ))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Webhook not configured"}));
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (_, body) = body_json(AppError::Internal("db password wrong".to_string())).await;
        assert_eq!(body, json!({"error": "Internal server error"}));
    }

    #[tokio::test]
    async fn test_upstream_carries_json_detail() {
        let err = AppError::upstream(
            "Razorpay create failed",
            RazorpayError::Api {
                status: 400,
                body: r#"{"error":{"description":"bad"}}"#.to_string(),
            },
        );
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Razorpay create failed");
        assert_eq!(body["detail"]["error"]["description"], "bad");
    }

    #[tokio::test]
    async fn test_upstream_text_detail() {
        let err = AppError::upstream(
            "Failed to download PDF",
            RazorpayError::Api {
                status: 404,
                body: "not found".to_string(),
            },
        );
        let (_, body) = body_json(err).await;
        assert_eq!(body["detail"], "not found");
    }
}
