//! Core types for the Kaalika storefront.
//!
//! This module provides type-safe wrappers for the domain concepts shared by
//! the storefront service and its tests.

pub mod email;
pub mod id;
pub mod notification;
pub mod order;
pub mod price;
pub mod profile;
pub mod status;
pub mod timestamp;

pub use email::{Email, EmailError};
pub use id::*;
pub use notification::{InvoiceRef, Notification, StoredNotification};
pub use order::{
    CartError, CartItem, CustomerContact, Order, OrderSummary, PaymentReference, cart_total,
    validate_cart,
};
pub use price::{Amount, CurrencyCode};
pub use profile::{PLACEHOLDER_NAME, UserProfile, display_name};
pub use status::{PaymentMethod, PaymentStatus};
