//! Kaalika Storefront - checkout and invoicing API.
//!
//! Serves the storefront API (port 3000 by default).
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - Firebase Authentication for shopper identity tokens
//! - Firestore (REST) for orders, profiles and admin notifications
//! - Razorpay for gateway orders, invoices and payment webhooks
//! - Strapi as the downstream order-management system

#![cfg_attr(not(test), forbid(unsafe_code))]

use kaalika_storefront::config::StorefrontConfig;
use kaalika_storefront::state::AppState;
use sentry::integrations::tracing::{self as sentry_tracing, EventFilter};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "kaalika_storefront=info,tower_http=debug";

/// Start Sentry (when a DSN is set) and install the tracing subscriber.
///
/// The returned guard flushes Sentry on drop and must outlive the server.
fn init_telemetry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let guard = config.sentry_dsn.as_deref().map(|dsn| {
        let guard = sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: config.sentry_environment.clone().map(Into::into),
                sample_rate: config.sentry_sample_rate,
                traces_sample_rate: config.sentry_traces_sample_rate,
                attach_stacktrace: true,
                ..Default::default()
            },
        ));
        let test_keys = config
            .razorpay
            .key_id
            .as_deref()
            .is_some_and(|id| id.starts_with("rzp_test_"));
        sentry::configure_scope(|scope| {
            scope.set_tag("razorpay.mode", if test_keys { "test" } else { "live" });
        });
        guard
    });

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(|metadata: &tracing::Metadata<'_>| match *metadata.level() {
            tracing::Level::ERROR | tracing::Level::WARN => EventFilter::Event,
            tracing::Level::INFO | tracing::Level::DEBUG => EventFilter::Breadcrumb,
            tracing::Level::TRACE => EventFilter::Ignore,
        }))
        .init();

    if guard.is_some() {
        tracing::info!("Sentry initialized");
    }
    guard
}

/// Log which integrations are live. Nothing here fails start-up: each
/// missing integration only disables the routes that need it.
fn report_integrations(state: &AppState) {
    let config = state.config();
    tracing::info!(
        firebase = state.firebase().ready,
        razorpay = state.razorpay().is_some(),
        webhook_secret = config.razorpay.webhook_secret.is_some(),
        order_backend = config.order_backend.is_some(),
        admin_secret = config.admin_secret.is_some(),
        webhook_test_mode = config.diagnostics.test_mode,
        "Integrations"
    );
    if !state.firebase().ready {
        tracing::warn!("Firebase not configured; store-backed routes will answer 500");
    }
    if config.razorpay.webhook_secret.is_none() && !config.diagnostics.test_mode {
        tracing::warn!("RAZORPAY_WEBHOOK_SECRET not set; webhooks will answer 500");
    }
}

#[tokio::main]
async fn main() {
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");
    let _sentry = init_telemetry(&config);

    let state = AppState::new(config.clone()).expect("Failed to build HTTP client");
    report_integrations(&state);

    let app = kaalika_storefront::app(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind storefront address");
    tracing::info!(%addr, "Storefront listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Resolve on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    let _ = tokio::signal::ctrl_c().await;

    tracing::info!("Shutdown signal received; draining connections");
}
