//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, one hub per request)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//!
//! Authentication is per-route, through the [`IdentityUser`] and
//! [`AdminAuth`] extractors.

pub mod auth;
pub mod request_id;

pub use auth::{AdminAuth, IdentityUser};
pub use request_id::request_id_middleware;
