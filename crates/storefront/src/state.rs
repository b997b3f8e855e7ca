//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::firebase::{FirebaseAdmin, FirebaseHandle, IdentityVerifier};
use crate::razorpay::RazorpayClient;
use crate::services::{OrderBackendClient, Reconciler, SnapshotWriter};
use crate::store::DocumentStore;

/// Timeout applied to every outbound request.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The Firebase backends are created lazily on
/// first use and reused for the life of the process.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    firebase: FirebaseAdmin,
    razorpay: Option<RazorpayClient>,
    order_backend: Option<OrderBackendClient>,
    snapshots: SnapshotWriter,
}

impl AppState {
    /// Create a new application state with a shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: StorefrontConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let firebase = FirebaseAdmin::new(config.firebase.clone(), http.clone());
        Ok(Self::from_parts(config, firebase, http))
    }

    /// Assemble state from an explicit Firebase initializer.
    #[must_use]
    pub fn from_parts(
        config: StorefrontConfig,
        firebase: FirebaseAdmin,
        http: reqwest::Client,
    ) -> Self {
        let razorpay = RazorpayClient::new(http.clone(), &config.razorpay);
        let order_backend = config
            .order_backend
            .as_ref()
            .map(|backend| OrderBackendClient::new(http, backend));
        let snapshots = SnapshotWriter::new(&config.diagnostics);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                firebase,
                razorpay,
                order_backend,
                snapshots,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Initialize (once) and return the Firebase backends.
    #[must_use]
    pub fn firebase(&self) -> FirebaseHandle {
        self.inner.firebase.initialize()
    }

    /// The document store, if Firebase is configured.
    #[must_use]
    pub fn store(&self) -> Option<Arc<dyn DocumentStore>> {
        self.firebase().store
    }

    /// The document store, or `Misconfigured` with the given message.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Misconfigured` when Firebase is not configured.
    pub fn require_store(&self, message: &str) -> Result<Arc<dyn DocumentStore>, AppError> {
        self.store()
            .ok_or_else(|| AppError::Misconfigured(message.to_owned()))
    }

    /// The identity-token verifier, if Firebase is configured.
    #[must_use]
    pub fn identity(&self) -> Option<Arc<dyn IdentityVerifier>> {
        self.firebase().identity
    }

    /// The Razorpay client, if key id and secret are configured.
    #[must_use]
    pub fn razorpay(&self) -> Option<&RazorpayClient> {
        self.inner.razorpay.as_ref()
    }

    /// The configured admin shared secret.
    #[must_use]
    pub fn admin_secret(&self) -> Option<&SecretString> {
        self.inner.config.admin_secret.as_ref()
    }

    /// A webhook reconciler over the current backends.
    #[must_use]
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            self.store(),
            self.inner.order_backend.clone(),
            self.inner.snapshots.clone(),
        )
    }
}
