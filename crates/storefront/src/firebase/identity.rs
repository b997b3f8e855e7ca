//! End-user identity token verification.
//!
//! Firebase Authentication issues RS256 ID tokens signed with Google's
//! `securetoken` keys. Keys are fetched as a JWKS and cached with `moka`
//! (1 hour TTL, refreshed on an unknown `kid` at most once per
//! [`MIN_REFRESH_INTERVAL`] by default).

use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use kaalika_core::UserUid;
use moka::future::Cache;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Public keys for Firebase ID tokens.
pub const SECURETOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Unknown key ids seen within this long of the last refresh are rejected
/// without refetching the key set.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Errors verifying an identity token.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The token is malformed, expired or fails a claim check.
    #[error("invalid identity token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    /// The token header carries no key id.
    #[error("identity token has no key id")]
    MissingKeyId,

    /// No published key matches the token's key id.
    #[error("unknown signing key {0}")]
    UnknownKey(String),

    /// The token has an empty subject.
    #[error("identity token has no subject")]
    MissingSubject,

    /// Fetching the signing keys failed.
    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(#[from] reqwest::Error),
}

/// The authenticated end user behind a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: UserUid,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Verifies bearer identity tokens.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify a raw token and return the identity it proves.
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError>;
}

#[derive(Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

/// [`IdentityVerifier`] for Firebase Authentication ID tokens.
pub struct FirebaseTokenVerifier {
    client: reqwest::Client,
    project_id: String,
    jwks_url: String,
    keys: Cache<String, DecodingKey>,
    refresh_interval: Duration,
    last_refresh: Mutex<Option<Instant>>,
}

impl FirebaseTokenVerifier {
    #[must_use]
    pub fn new(client: reqwest::Client, project_id: impl Into<String>) -> Self {
        Self::with_jwks_url(client, project_id, SECURETOKEN_JWKS_URL)
    }

    /// Use a non-default key endpoint.
    #[must_use]
    pub fn with_jwks_url(
        client: reqwest::Client,
        project_id: impl Into<String>,
        jwks_url: impl Into<String>,
    ) -> Self {
        let keys = Cache::builder()
            .max_capacity(32)
            .time_to_live(Duration::from_secs(3600)) // 1 hour
            .build();

        Self {
            client,
            project_id: project_id.into(),
            jwks_url: jwks_url.into(),
            keys,
            refresh_interval: MIN_REFRESH_INTERVAL,
            last_refresh: Mutex::new(None),
        }
    }

    /// Override the minimum time between key set refreshes.
    #[must_use]
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    async fn signing_key(&self, kid: &str) -> Result<DecodingKey, IdentityError> {
        if let Some(key) = self.keys.get(kid).await {
            return Ok(key);
        }

        // Held across the fetch so concurrent misses share one refresh.
        let mut last_refresh = self.last_refresh.lock().await;
        if let Some(key) = self.keys.get(kid).await {
            return Ok(key);
        }
        if last_refresh.is_some_and(|at| at.elapsed() < self.refresh_interval) {
            debug!(kid, "Key set refreshed recently; not refetching");
            return Err(IdentityError::UnknownKey(kid.to_owned()));
        }

        self.refresh_keys().await?;
        *last_refresh = Some(Instant::now());
        self.keys
            .get(kid)
            .await
            .ok_or_else(|| IdentityError::UnknownKey(kid.to_owned()))
    }

    #[instrument(skip(self))]
    async fn refresh_keys(&self) -> Result<(), IdentityError> {
        let set: JwkSet = self
            .client
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(count = set.keys.len(), "Refreshed identity signing keys");
        for jwk in set.keys {
            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => self.keys.insert(jwk.kid, key).await,
                Err(e) => tracing::warn!(kid = %jwk.kid, error = %e, "Skipping malformed JWK"),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let header = jsonwebtoken::decode_header(token)?;
        let kid = header.kid.ok_or(IdentityError::MissingKeyId)?;
        let key = self.signing_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[self.issuer()]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);

        let claims = jsonwebtoken::decode::<IdTokenClaims>(token, &key, &validation)?.claims;
        if claims.sub.trim().is_empty() {
            return Err(IdentityError::MissingSubject);
        }

        Ok(VerifiedIdentity {
            uid: UserUid::new(claims.sub),
            email: claims.email,
            name: claims.name,
        })
    }
}
