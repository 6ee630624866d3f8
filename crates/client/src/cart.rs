//! Cart controller.
//!
//! Presents one cart to the frontend whether or not the server cart endpoint
//! is reachable. A successful load makes the server authoritative and clears
//! the local fallback cache; a failed load rebuilds the cart from that cache.
//! Each item's [`CartSource`] decides whether an edit goes to the server or
//! stays local.
//!
//! Operations run one request at a time and always finish by updating the
//! in-memory cart, so a failure leaves a cart that is either the server's or
//! the cached one, never a half-applied edit.

use bazaar_core::{
    CachedLine, Cart, CartEntryId, CartItem, CartSource, ProductId, QuantityError, UserId,
    UserRole,
};
use futures::future::join_all;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::api::{
    AddToCartRequest, ApiError, CheckoutKind, CheckoutLine, CheckoutRequest, MarketplaceApi,
    Product, UserProfile,
};
use crate::cache::CartCache;
use crate::notice::Notice;
use crate::store::{KeyValueStore, StoreError};

const ADD_TO_CART_FAILED: &str = "Failed to add to cart";
const CHECKOUT_FAILED: &str = "Failed to create checkout session";

/// Errors surfaced by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The signed-in user may not shop.
    #[error("Only buyers can use the cart (signed in as {0})")]
    NotBuyer(UserRole),

    /// No line with the given display ID.
    #[error("Item not found in cart: {0}")]
    ItemNotFound(String),

    /// The quantity change was rejected client-side.
    #[error(transparent)]
    Quantity(#[from] QuantityError),

    /// More units requested than the product has in stock.
    #[error("Quantity exceeds available stock ({available} left)")]
    InsufficientStock {
        /// Units the product reports in stock.
        available: i64,
    },

    /// Checkout was attempted on an empty cart.
    #[error("Your cart is empty")]
    EmptyCart,

    /// The checkout session succeeded but named no payment page.
    #[error("No checkout URL received")]
    MissingCheckoutUrl,

    /// The payment page URL is malformed.
    #[error("Invalid checkout URL {url}: {reason}")]
    InvalidCheckoutUrl {
        /// URL as returned by the server.
        url: String,
        /// Parse failure.
        reason: String,
    },

    /// Adding to the server cart failed.
    #[error("Failed to add to cart: {0}")]
    AddToCart(#[source] ApiError),

    /// Creating the checkout session failed.
    #[error("Failed to create checkout session: {0}")]
    Checkout(#[source] ApiError),

    /// Any other API failure.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The fallback cache could not be read or written.
    #[error("Cart cache error: {0}")]
    Store(#[from] StoreError),
}

impl CartError {
    /// The single message shown to the user for this error.
    ///
    /// Server-provided details win over generic descriptions.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::AddToCart(e) => e
                .detail_message()
                .unwrap_or_else(|| ADD_TO_CART_FAILED.to_string()),
            Self::Checkout(e) => e
                .detail_message()
                .unwrap_or_else(|| CHECKOUT_FAILED.to_string()),
            Self::Api(e) => e.detail_message().unwrap_or_else(|| e.to_string()),
            other => other.to_string(),
        }
    }
}

/// How the cart was obtained by [`CartController::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Fresh from the server; the fallback cache has been cleared.
    Server,
    /// The server cart was unavailable and the cart was rebuilt locally.
    Fallback {
        /// Why the server load failed.
        reason: String,
        /// Cached lines whose product detail could not be fetched.
        dropped: usize,
    },
}

impl LoadOutcome {
    /// Notice to show for this outcome, if any.
    #[must_use]
    pub fn notice(&self) -> Option<Notice> {
        match self {
            Self::Server => None,
            Self::Fallback { reason, .. } => Some(Notice::warning(format!(
                "Server cart unavailable ({reason}). Showing cached cart."
            ))),
        }
    }
}

/// Where to send the user to pay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRedirect {
    /// Payment page.
    pub url: Url,
    /// Checkout session ID, when the server returned one.
    pub session_id: Option<String>,
}

/// Mediates between the server cart and the local fallback cache.
pub struct CartController<A, S> {
    api: A,
    cache: CartCache<S>,
    user_id: UserId,
    cart: Cart,
}

impl<A, S> CartController<A, S>
where
    A: MarketplaceApi,
    S: KeyValueStore,
{
    /// Create a controller for `user`, starting from an empty cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotBuyer`] unless the user is a buyer.
    pub fn new(api: A, store: S, user: &UserProfile) -> Result<Self, CartError> {
        if !user.role.can_shop() {
            return Err(CartError::NotBuyer(user.role));
        }

        Ok(Self {
            api,
            cache: CartCache::new(store, &user.id),
            user_id: user.id.clone(),
            cart: Cart::empty(),
        })
    }

    /// The cart as currently presented.
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// The API client.
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// The fallback cache.
    pub const fn cache(&self) -> &CartCache<S> {
        &self.cache
    }

    /// Owner of this cart.
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    // =========================================================================
    // Load
    // =========================================================================

    /// Load the cart, preferring the server and falling back to the cache.
    ///
    /// # Errors
    ///
    /// Returns the server error only when the server cart is unavailable and
    /// the fallback cache has nothing to show; the cart is then empty.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn load(&mut self) -> Result<LoadOutcome, CartError> {
        let err = match self.api.cart().await {
            Ok(server_cart) => {
                self.cart = Cart::new(server_cart.into_items());
                if let Err(e) = self.cache.clear() {
                    warn!(error = %e, "Failed to clear cart cache after server sync");
                }
                return Ok(LoadOutcome::Server);
            }
            Err(e) => e,
        };

        warn!(error = %err, "Server cart unavailable, trying local cache");

        let lines = match self.cache.lines() {
            Ok(lines) => lines,
            Err(e) => {
                warn!(error = %e, "Cart cache unreadable");
                Vec::new()
            }
        };

        if lines.is_empty() {
            self.cart = Cart::empty();
            return Err(CartError::Api(err));
        }

        let items = self.rehydrate(&lines).await;
        let dropped = lines.len() - items.len();
        self.cart = Cart::new(items);

        Ok(LoadOutcome::Fallback {
            reason: CartError::Api(err).user_message(),
            dropped,
        })
    }

    /// Fetch product detail for each cached line, skipping failures.
    async fn rehydrate(&self, lines: &[CachedLine]) -> Vec<CartItem> {
        let fetches = lines.iter().map(|line| async move {
            match self.api.product(&line.product_id).await {
                Ok(product) => Some(product.into_fallback_item(line)),
                Err(e) => {
                    warn!(product_id = %line.product_id, error = %e, "Dropping cached cart line");
                    None
                }
            }
        });

        join_all(fetches).await.into_iter().flatten().collect()
    }

    /// Reload after a mutation; the load result only affects what is shown.
    async fn reload(&mut self) {
        match self.load().await {
            Ok(LoadOutcome::Server) => {}
            Ok(LoadOutcome::Fallback { reason, .. }) => {
                warn!(%reason, "Reload fell back to cached cart");
            }
            Err(e) => warn!(error = %e, "Reload failed"),
        }
    }

    // =========================================================================
    // Add
    // =========================================================================

    /// Add `quantity` units of `product` to the server cart and record them in
    /// the fallback cache. Returns the server's confirmation message.
    ///
    /// The displayed cart is not refreshed; call [`CartController::load`].
    ///
    /// # Errors
    ///
    /// Rejects a zero quantity or one above the product's known stock without
    /// a network call; otherwise returns [`CartError::AddToCart`] on failure.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_to_cart(
        &mut self,
        product: &Product,
        quantity: u32,
    ) -> Result<String, CartError> {
        if quantity == 0 {
            return Err(QuantityError::BelowMinimum { requested: 0 }.into());
        }
        match product.stock {
            Some(available) if i64::from(quantity) > available => {
                return Err(CartError::InsufficientStock { available });
            }
            _ => {}
        }

        let request = AddToCartRequest {
            product_id: product.id.clone(),
            quantity,
        };
        let response = self.api.add_to_cart(&request).await.map_err(|e| {
            error!(error = %e, "Failed to add item to cart");
            CartError::AddToCart(e)
        })?;

        if let Err(e) = self.cache.record_add(&product.id, quantity) {
            warn!(error = %e, "Failed to record add in cart cache");
        }

        Ok(response
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Added to cart".to_string()))
    }

    // =========================================================================
    // Update / Remove
    // =========================================================================

    /// Change the quantity of the line `item_id` by `delta`.
    ///
    /// Fallback lines are rewritten in the cache only. Server lines are
    /// deleted and re-added with the new quantity, then the cart is reloaded;
    /// the reload also happens when the edit fails.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Quantity`] (no-op) if the result would drop below
    /// one, [`CartError::ItemNotFound`] for an unknown line, or the failure of
    /// the edit itself.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn update_quantity(&mut self, item_id: &str, delta: i64) -> Result<u32, CartError> {
        let item = self
            .cart
            .find(item_id)
            .cloned()
            .ok_or_else(|| CartError::ItemNotFound(item_id.to_string()))?;
        let new_quantity = item.adjusted_quantity(delta)?;

        match item.source {
            CartSource::Fallback => {
                self.cache.set_quantity(&item.product_id, new_quantity)?;
                if let Some(line) = self.cart.find_mut(item_id) {
                    line.set_quantity(new_quantity)?;
                }
                Ok(new_quantity)
            }
            CartSource::Server(entry_id) => {
                let result = self
                    .replace_server_line(&entry_id, &item.product_id, new_quantity)
                    .await;
                if let Err(e) = &result {
                    error!(error = %e, "Failed to update quantity");
                }
                self.reload().await;
                result.map(|()| new_quantity)
            }
        }
    }

    /// Delete then re-add a server line with a new quantity.
    async fn replace_server_line(
        &self,
        entry_id: &CartEntryId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), CartError> {
        match self.api.remove_from_cart(entry_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                info!(%entry_id, "Cart entry already gone, re-adding");
            }
            Err(e) => return Err(e.into()),
        }

        let request = AddToCartRequest {
            product_id: product_id.clone(),
            quantity,
        };
        self.api.add_to_cart(&request).await?;
        Ok(())
    }

    /// Remove the line `item_id`.
    ///
    /// Fallback lines are dropped from the cache only. Server lines are
    /// deleted, removed from view optimistically, and the cart is reloaded
    /// whether or not the delete succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] for an unknown line, or the delete
    /// failure.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn remove_item(&mut self, item_id: &str) -> Result<(), CartError> {
        let item = self
            .cart
            .find(item_id)
            .cloned()
            .ok_or_else(|| CartError::ItemNotFound(item_id.to_string()))?;

        match item.source {
            CartSource::Fallback => {
                self.cache.remove(&item.product_id)?;
                self.cart.remove(item_id);
                Ok(())
            }
            CartSource::Server(entry_id) => {
                let result = match self.api.remove_from_cart(&entry_id).await {
                    Ok(()) => Ok(()),
                    Err(e) if e.is_not_found() => {
                        info!(%entry_id, "Cart entry already gone");
                        Ok(())
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to remove item");
                        Err(CartError::Api(e))
                    }
                };
                if result.is_ok() {
                    self.cart.remove(item_id);
                }
                self.reload().await;
                result
            }
        }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Create a checkout session for the whole cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::EmptyCart`] without a network call for an empty
    /// cart, [`CartError::MissingCheckoutUrl`] if the session names no payment
    /// page, or [`CartError::Checkout`] if the request fails.
    #[instrument(skip(self), fields(user_id = %self.user_id, lines = self.cart.len()))]
    pub async fn checkout(&self) -> Result<CheckoutRedirect, CartError> {
        if self.cart.is_empty() {
            return Err(CartError::EmptyCart);
        }

        let request = CheckoutRequest {
            items: self
                .cart
                .items()
                .iter()
                .map(|item| CheckoutLine {
                    id: item.product_id.clone(),
                    quantity: item.quantity(),
                })
                .collect(),
            kind: CheckoutKind::Product,
        };

        let session = self
            .api
            .create_checkout_session(&request)
            .await
            .map_err(|e| {
                error!(error = %e, "Checkout failed");
                CartError::Checkout(e)
            })?;

        let raw = session.redirect_url().ok_or(CartError::MissingCheckoutUrl)?;
        let url = Url::parse(raw).map_err(|e| CartError::InvalidCheckoutUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        info!(%url, "Redirecting to checkout");
        Ok(CheckoutRedirect {
            url,
            session_id: session.session_id.clone(),
        })
    }
}
