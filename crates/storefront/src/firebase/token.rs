//! OAuth access tokens for the service account.
//!
//! Uses the JWT-bearer grant: an RS256 assertion signed with the service
//! account key is exchanged at the token URI for a short-lived access token.
//! Tokens are cached in memory and refreshed 60 seconds before expiry.

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::instrument;

use super::credentials::{CredentialError, ServiceAccount};

/// OAuth scope granting Firestore access.
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertion lifetime in seconds (the maximum Google accepts).
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Clone)]
struct AccessToken {
    token: SecretString,
    /// Unix timestamp.
    expires_at: i64,
}

impl AccessToken {
    fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        // Consider expired if less than 60 seconds remaining
        now >= self.expires_at - 60
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Supplies bearer tokens for Google APIs.
pub struct AccessTokenProvider {
    client: reqwest::Client,
    account: Option<ServiceAccount>,
    cached: RwLock<Option<AccessToken>>,
}

impl AccessTokenProvider {
    #[must_use]
    pub fn new(client: reqwest::Client, account: ServiceAccount) -> Self {
        Self {
            client,
            account: Some(account),
            cached: RwLock::new(None),
        }
    }

    /// A provider that always hands out the given token (emulators, tests).
    #[must_use]
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            account: None,
            cached: RwLock::new(Some(AccessToken {
                token: SecretString::from(token.into()),
                expires_at: i64::MAX,
            })),
        }
    }

    /// A valid access token, exchanging a fresh assertion if needed.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError` if signing or the token exchange fails.
    pub async fn access_token(&self) -> Result<SecretString, CredentialError> {
        if let Some(cached) = self.cached.read().await.as_ref()
            && !cached.is_expired()
        {
            return Ok(cached.token.clone());
        }

        let mut slot = self.cached.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(cached) = slot.as_ref()
            && !cached.is_expired()
        {
            return Ok(cached.token.clone());
        }

        let account = self.account.as_ref().ok_or(CredentialError::NotConfigured)?;
        let fresh = self.exchange(account).await?;
        let token = fresh.token.clone();
        *slot = Some(fresh);
        Ok(token)
    }

    #[instrument(skip(self, account), fields(client_email = %account.client_email))]
    async fn exchange(&self, account: &ServiceAccount) -> Result<AccessToken, CredentialError> {
        let now = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &account.client_email,
            scope: DATASTORE_SCOPE,
            aud: &account.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&account.private_key_id);
        let key = EncodingKey::from_rsa_pem(account.private_key.expose_secret().as_bytes())?;
        let assertion = jsonwebtoken::encode(&header, &claims, &key)?;

        let response = self
            .client
            .post(&account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CredentialError::TokenRejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: TokenResponse = response.json().await?;
        tracing::debug!(expires_in = body.expires_in, "Obtained service access token");
        Ok(AccessToken {
            token: SecretString::from(body.access_token),
            expires_at: now + body.expires_in,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const TEST_KEY: &str = include_str!("../../testdata/rsa_test_key.pem");

    fn account(token_uri: String) -> ServiceAccount {
        ServiceAccount {
            project_id: "kaalika-test".to_string(),
            client_email: "svc@kaalika-test.iam.gserviceaccount.com".to_string(),
            private_key_id: Some("key-1".to_string()),
            private_key: SecretString::from(TEST_KEY),
            token_uri,
        }
    }

    #[test]
    fn test_token_expiry_margin() {
        let now = chrono::Utc::now().timestamp();
        let fresh = AccessToken {
            token: SecretString::from("t"),
            expires_at: now + 3600,
        };
        let nearly = AccessToken {
            token: SecretString::from("t"),
            expires_at: now + 30,
        };
        assert!(!fresh.is_expired());
        assert!(nearly.is_expired());
    }

    #[tokio::test]
    async fn test_fixed_provider() {
        let provider = AccessTokenProvider::fixed("static-token");
        let token = provider.access_token().await.unwrap();
        assert_eq!(token.expose_secret(), "static-token");
    }

    #[tokio::test]
    async fn test_exchange_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("jwt-bearer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.test",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider =
            AccessTokenProvider::new(reqwest::Client::new(), account(format!("{}/token", server.uri())));
        let first = provider.access_token().await.unwrap();
        let second = provider.access_token().await.unwrap();
        assert_eq!(first.expose_secret(), "ya29.test");
        assert_eq!(second.expose_secret(), "ya29.test");
    }

    #[tokio::test]
    async fn test_rejected_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let provider =
            AccessTokenProvider::new(reqwest::Client::new(), account(format!("{}/token", server.uri())));
        let err = provider.access_token().await.unwrap_err();
        assert!(matches!(
            err,
            CredentialError::TokenRejected { status: 400, .. }
        ));
    }
}
