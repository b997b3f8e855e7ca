//! Firebase service identity: credential, document store and token verifier.
//!
//! [`FirebaseAdmin`] is the credential initializer. It is built once from
//! configuration and passed to whoever needs it; [`FirebaseAdmin::initialize`]
//! assembles the backends on first use and returns the same handles on every
//! later call. Missing or invalid credentials yield a handle with
//! `ready == false` and no backends, never an error.

mod credentials;
mod identity;
mod token;

use std::sync::{Arc, OnceLock};

pub use credentials::{CredentialError, DEFAULT_TOKEN_URI, ServiceAccount, unescape_newlines};
pub use identity::{
    FirebaseTokenVerifier, IdentityError, IdentityVerifier, SECURETOKEN_JWKS_URL,
    VerifiedIdentity,
};
pub use token::{AccessTokenProvider, DATASTORE_SCOPE};

use crate::config::FirebaseConfig;
use crate::store::{DocumentStore, FirestoreStore};

/// Backends produced by a successful initialization.
#[derive(Clone)]
struct FirebaseApp {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityVerifier>,
}

/// Result of [`FirebaseAdmin::initialize`].
#[derive(Clone)]
pub struct FirebaseHandle {
    pub store: Option<Arc<dyn DocumentStore>>,
    pub identity: Option<Arc<dyn IdentityVerifier>>,
    pub ready: bool,
}

impl std::fmt::Debug for FirebaseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseHandle")
            .field("ready", &self.ready)
            .finish_non_exhaustive()
    }
}

/// Lazily-initialized Firebase service client.
pub struct FirebaseAdmin {
    config: FirebaseConfig,
    client: reqwest::Client,
    app: OnceLock<Option<FirebaseApp>>,
}

impl FirebaseAdmin {
    /// Prepare an initializer. No credential parsing or network I/O happens here.
    #[must_use]
    pub fn new(config: FirebaseConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            client,
            app: OnceLock::new(),
        }
    }

    /// An already-initialized admin over injected backends.
    #[must_use]
    pub fn with_backends(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityVerifier>,
    ) -> Self {
        Self {
            config: FirebaseConfig::default(),
            client: reqwest::Client::new(),
            app: OnceLock::from(Some(FirebaseApp { store, identity })),
        }
    }

    /// Build the backends on first call; afterwards return the same ones.
    pub fn initialize(&self) -> FirebaseHandle {
        match self.app.get_or_init(|| self.create_app()) {
            Some(app) => FirebaseHandle {
                store: Some(Arc::clone(&app.store)),
                identity: Some(Arc::clone(&app.identity)),
                ready: true,
            },
            None => FirebaseHandle {
                store: None,
                identity: None,
                ready: false,
            },
        }
    }

    /// Whether [`initialize`](Self::initialize) has already run.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.app.get().is_some()
    }

    fn create_app(&self) -> Option<FirebaseApp> {
        let account = match ServiceAccount::from_config(&self.config) {
            Ok(account) => account,
            Err(CredentialError::NotConfigured) => {
                tracing::warn!("Firebase service account not configured; store disabled");
                return None;
            }
            Err(e) => {
                tracing::error!(error = %e, "Firebase service account rejected; store disabled");
                return None;
            }
        };

        tracing::info!(
            project_id = %account.project_id,
            client_email = %account.client_email,
            "Firebase service account loaded"
        );
        let project_id = account.project_id.clone();
        let tokens = Arc::new(AccessTokenProvider::new(self.client.clone(), account));
        let store = FirestoreStore::new(self.client.clone(), tokens, &project_id);
        let identity = FirebaseTokenVerifier::new(self.client.clone(), project_id);

        Some(FirebaseApp {
            store: Arc::new(store),
            identity: Arc::new(identity),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    const TEST_KEY: &str = include_str!("../../testdata/rsa_test_key.pem");

    fn configured() -> FirebaseConfig {
        FirebaseConfig {
            project_id: Some("kaalika-test".to_string()),
            client_email: Some("svc@kaalika-test.iam.gserviceaccount.com".to_string()),
            private_key: Some(SecretString::from(TEST_KEY.replace('\n', "\\n"))),
            ..FirebaseConfig::default()
        }
    }

    #[test]
    fn test_unconfigured_is_not_ready() {
        let admin = FirebaseAdmin::new(FirebaseConfig::default(), reqwest::Client::new());
        let handle = admin.initialize();
        assert!(!handle.ready);
        assert!(handle.store.is_none());
        assert!(handle.identity.is_none());
    }

    #[test]
    fn test_initialize_is_lazy_and_idempotent() {
        let admin = FirebaseAdmin::new(configured(), reqwest::Client::new());
        assert!(!admin.is_initialized());

        let first = admin.initialize();
        assert!(admin.is_initialized());
        let second = admin.initialize();

        assert!(first.ready && second.ready);
        assert!(Arc::ptr_eq(
            first.store.as_ref().unwrap(),
            second.store.as_ref().unwrap()
        ));
        assert!(Arc::ptr_eq(
            first.identity.as_ref().unwrap(),
            second.identity.as_ref().unwrap()
        ));
    }

    #[test]
    fn test_with_backends_is_ready() {
        struct Nobody;

        #[async_trait::async_trait]
        impl IdentityVerifier for Nobody {
            async fn verify(&self, _token: &str) -> Result<VerifiedIdentity, IdentityError> {
                Err(IdentityError::MissingSubject)
            }
        }

        let store: Arc<dyn DocumentStore> = Arc::new(crate::store::MemoryStore::new());
        let admin = FirebaseAdmin::with_backends(Arc::clone(&store), Arc::new(Nobody));
        assert!(admin.is_initialized());
        let handle = admin.initialize();
        assert!(handle.ready);
        assert!(Arc::ptr_eq(handle.store.as_ref().unwrap(), &store));
    }
}
