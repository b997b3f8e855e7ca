//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `checkout` - Order intake: cart validation, payment proof, profile append
//! - `invoicing` - Gateway invoice issuance from the admin console
//! - `reconcile` - Webhook verification and notification reconciliation
//! - `profile` - Profile fetch-or-create and contact sync
//! - `order_backend` - External order-management client
//! - `diagnostics` - Test-mode webhook snapshots

pub mod checkout;
pub mod diagnostics;
pub mod invoicing;
pub mod order_backend;
pub mod profile;
pub mod reconcile;

pub use diagnostics::SnapshotWriter;
pub use order_backend::{OrderBackendClient, OrderBackendError};
pub use reconcile::Reconciler;
