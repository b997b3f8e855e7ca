//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Configuration presence report
//!
//! # Checkout (identity token)
//! POST /checkout               - Place an order
//! POST /create-order           - Create a gateway order for the checkout widget
//! POST /send-invoice           - Retired, always 410
//! GET  /orders/{id}            - Fetch a placed order
//!
//! # Profile (identity token)
//! GET  /user/profile           - Fetch-or-create profile
//! POST /user/profile           - Merge name/email
//!
//! # Admin console (admin secret)
//! POST /admin/notify-order     - Record a notification (no auth)
//! GET  /admin/notifications    - 50 most recent notifications
//! GET  /admin/unread-count     - Unseen notifications in the last 7 days
//! POST /admin/razorpay-issue   - Issue a gateway invoice
//! GET  /admin/razorpay-pdf     - Proxy an invoice PDF
//!
//! # Webhooks (HMAC signature)
//! POST /webhooks/razorpay      - Gateway invoice events
//! ```

pub mod admin;
pub mod checkout;
pub mod health;
pub mod orders;
pub mod user;
pub mod webhooks;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the admin console routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/notify-order", post(admin::notify_order))
        .route("/notifications", get(admin::notifications))
        .route("/unread-count", get(admin::unread_count))
        .route("/razorpay-issue", post(admin::razorpay_issue))
        .route("/razorpay-pdf", get(admin::razorpay_pdf))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        // Checkout
        .route("/checkout", post(checkout::checkout))
        .route("/create-order", post(checkout::create_order))
        .route("/send-invoice", post(checkout::send_invoice))
        .route("/orders/{id}", get(orders::show))
        // Profile
        .route("/user/profile", get(user::profile).post(user::update_profile))
        // Admin console
        .nest("/admin", admin_routes())
        // Gateway callbacks
        .route("/webhooks/razorpay", post(webhooks::razorpay))
}
