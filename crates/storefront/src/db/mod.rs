//! Document-store repositories.
//!
//! # Collections
//!
//! - `orders` - Placed orders keyed by order id
//! - `users` - Profiles keyed by identity-provider subject, carrying
//!   append-only `orderHistory` and `invoices` lists
//! - `admin_notifications` - Purchase events for the admin console
//!
//! Repositories borrow a [`DocumentStore`](crate::store::DocumentStore) and
//! translate between documents and `kaalika_core` types.

pub mod notifications;
pub mod orders;
pub mod profiles;

pub use notifications::NotificationRepository;
pub use orders::OrderRepository;
pub use profiles::ProfileRepository;

/// Collection holding placed orders.
pub const ORDERS: &str = "orders";

/// Collection holding user profiles.
pub const USERS: &str = "users";

/// Collection holding admin notifications.
pub const ADMIN_NOTIFICATIONS: &str = "admin_notifications";
