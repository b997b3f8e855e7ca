//! Authentication extractors.
//!
//! Two kinds of caller exist: shoppers presenting a Firebase ID token, and the
//! admin console presenting the shared admin secret. Both arrive as
//! `Authorization: Bearer <token>`.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use secrecy::ExposeSecret;

use crate::error::{AppError, set_sentry_user};
use crate::firebase::VerifiedIdentity;
use crate::razorpay::signature::constant_time_compare;
use crate::state::AppState;

/// Extractor that requires a verified identity token.
///
/// Rejects with 401 when the header is missing or the token fails
/// verification, and with 500 when Firebase is not configured.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(IdentityUser(user): IdentityUser) -> String {
///     user.uid.to_string()
/// }
/// ```
pub struct IdentityUser(pub VerifiedIdentity);

impl FromRequestParts<AppState> for IdentityUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let verifier = state
            .identity()
            .ok_or_else(|| AppError::Misconfigured("Firebase not configured".into()))?;

        let identity = verifier.verify(token).await.map_err(|e| {
            tracing::warn!(error = %e, "Identity token rejected");
            AppError::Unauthorized
        })?;

        set_sentry_user(&identity.uid, identity.email.as_deref());
        Ok(Self(identity))
    }
}

/// Extractor that requires the admin shared secret.
///
/// An unset secret rejects every request.
pub struct AdminAuth;

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let secret = state.admin_secret().ok_or_else(|| {
            tracing::warn!("ADMIN_SECRET not configured; rejecting admin request");
            AppError::Unauthorized
        })?;
        let token = bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;

        if constant_time_compare(token, secret.expose_secret()) {
            Ok(Self)
        } else {
            Err(AppError::Unauthorized)
        }
    }
}

/// The token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
