//! Kaalika Core - Shared domain types.
//!
//! This crate provides the types used by the storefront service and its
//! integration tests: orders and carts, user profiles, admin notifications,
//! money amounts and identifiers.
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! document-store access, no HTTP clients. This keeps it lightweight and
//! allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, amounts, emails, orders, profiles and notifications

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
