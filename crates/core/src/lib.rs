//! Bazaar Core - Shared types library.
//!
//! This crate provides the types shared by every Bazaar component:
//! - `client` - REST API client, fallback cart cache, and cart controller
//! - `cli` - Command-line frontend for the cart
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, cart items, and user roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
