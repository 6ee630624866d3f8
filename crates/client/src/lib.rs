//! Bazaar Client - marketplace API access and the buyer's cart.
//!
//! # Architecture
//!
//! - [`api`] - REST client behind the [`api::MarketplaceApi`] trait
//! - [`store`] - Key-value storage for locally persisted state
//! - [`cache`] - Per-user fallback cart cache on top of a store
//! - [`cart`] - Controller that reconciles the server cart with the cache
//! - [`notice`] - User-facing notifications produced by cart actions
//! - [`config`] - Environment-driven configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_client::{CartController, ClientConfig, FileStore, HttpMarketplaceApi};
//! use bazaar_client::api::MarketplaceApi;
//!
//! let config = ClientConfig::from_env()?;
//! let api = HttpMarketplaceApi::new(&config)?;
//! let profile = api.profile().await?;
//! let mut cart = CartController::new(api, FileStore::new(&config.state_dir), &profile)?;
//! cart.load().await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cache;
pub mod cart;
pub mod config;
pub mod notice;
pub mod store;

pub use api::{ApiError, HttpMarketplaceApi, MarketplaceApi};
pub use cache::CartCache;
pub use cart::{CartController, CartError, CheckoutRedirect, LoadOutcome};
pub use config::{ClientConfig, ConfigError};
pub use notice::{Notice, NoticeLevel};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
