//! Kaalika Storefront library.
//!
//! Checkout, admin invoicing and payment-webhook reconciliation for the
//! Kaalika storefront. The crate is a library so the router can be driven
//! in-process by tests; `main.rs` only adds process-level concerns.
//!
//! # External collaborators
//!
//! - Firebase: identity tokens and the Firestore document store
//! - Razorpay: gateway orders, invoices, invoice PDFs, webhooks
//! - Strapi: order-management system notified when invoices are paid

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod firebase;
pub mod middleware;
pub mod razorpay;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use axum::Router;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the application router with request tracing.
///
/// Sentry layers are added by the binary, outermost.
pub fn app(state: AppState) -> Router {
    routes::routes()
        .with_state(state)
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}
