//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod price;
pub mod role;

pub use cart::{CachedLine, Cart, CartItem, CartSource, MIN_QUANTITY, QuantityError};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use role::UserRole;
