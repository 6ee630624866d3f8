//! Client-side cart model.
//!
//! A [`Cart`] is what the user sees. Each [`CartItem`] remembers where it came
//! from through its [`CartSource`]: the server cart, or the local fallback
//! cache used while the server cart is unreachable. Operations on an item
//! dispatch on that tag rather than on any property of its identifiers.

use serde::{Deserialize, Serialize};

use super::id::{CartEntryId, ProductId};
use super::price::Price;

/// Smallest quantity a cart line may hold.
pub const MIN_QUANTITY: u32 = 1;

/// Rejected quantity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    /// The change would take the quantity below [`MIN_QUANTITY`].
    #[error("quantity cannot go below {MIN_QUANTITY} (requested {requested})")]
    BelowMinimum {
        /// The quantity the change would have produced.
        requested: i64,
    },
    /// The change would overflow the quantity type.
    #[error("quantity is too large")]
    Overflow,
}

/// Where a cart item is served from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entry_id", rename_all = "snake_case")]
pub enum CartSource {
    /// A server cart entry with its server-assigned ID.
    Server(CartEntryId),
    /// Rebuilt from the local fallback cache.
    Fallback,
}

impl CartSource {
    /// Whether this item lives only in the local fallback cache.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback)
    }
}

/// A single line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Where this line is served from.
    pub source: CartSource,
    /// The referenced catalog product.
    pub product_id: ProductId,
    /// Product title at fetch time.
    pub title: String,
    /// Product category at fetch time.
    pub category: String,
    /// First product image, if any.
    pub image: Option<String>,
    /// Unit price at fetch time.
    pub price: Price,
    quantity: u32,
}

impl CartItem {
    /// Title shown when the product carries none.
    pub const DEFAULT_TITLE: &'static str = "Product";

    /// Create a cart line. Quantities below [`MIN_QUANTITY`] are raised to it.
    #[must_use]
    pub fn new(source: CartSource, product_id: ProductId, quantity: u32) -> Self {
        Self {
            source,
            product_id,
            title: Self::DEFAULT_TITLE.to_string(),
            category: String::new(),
            image: None,
            price: Price::zero(),
            quantity: quantity.max(MIN_QUANTITY),
        }
    }

    /// Display identifier: the server entry ID, or the product ID for
    /// fallback lines.
    #[must_use]
    pub fn id(&self) -> &str {
        match &self.source {
            CartSource::Server(entry_id) => entry_id.as_str(),
            CartSource::Fallback => self.product_id.as_str(),
        }
    }

    /// Current quantity, always at least [`MIN_QUANTITY`].
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Quantity after applying `delta`, without modifying the item.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::BelowMinimum`] if the result would be below
    /// [`MIN_QUANTITY`].
    pub fn adjusted_quantity(&self, delta: i64) -> Result<u32, QuantityError> {
        let requested = i64::from(self.quantity).saturating_add(delta);
        if requested < i64::from(MIN_QUANTITY) {
            return Err(QuantityError::BelowMinimum { requested });
        }
        u32::try_from(requested).map_err(|_| QuantityError::Overflow)
    }

    /// Set the quantity.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::BelowMinimum`] for zero.
    pub fn set_quantity(&mut self, quantity: u32) -> Result<(), QuantityError> {
        if quantity < MIN_QUANTITY {
            return Err(QuantityError::BelowMinimum {
                requested: i64::from(quantity),
            });
        }
        self.quantity = quantity;
        Ok(())
    }

    /// Price of this line (unit price times quantity).
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// The cart as presented to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Create a cart from its lines.
    #[must_use]
    pub const fn new(items: Vec<CartItem>) -> Self {
        Self { items }
    }

    /// Create an empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self { items: Vec::new() }
    }

    /// All lines in display order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Find a line by its display identifier.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Find a line by its display identifier, mutably.
    pub fn find_mut(&mut self, id: &str) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    /// Remove a line by its display identifier, returning it if present.
    pub fn remove(&mut self, id: &str) -> Option<CartItem> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        Some(self.items.remove(index))
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items
            .iter()
            .map(CartItem::line_total)
            .fold(Price::zero(), |acc, line| {
                Price::new(acc.amount + line.amount, line.currency_code)
            })
    }

    /// Whether any line is served from the fallback cache.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.items.iter().any(|item| item.source.is_fallback())
    }
}

/// One entry of the local fallback cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedLine {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl CachedLine {
    /// Create a cache entry. Quantities below [`MIN_QUANTITY`] are raised to it.
    #[must_use]
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity: quantity.max(MIN_QUANTITY),
        }
    }
}

const fn default_quantity() -> u32 {
    MIN_QUANTITY
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn server_item(entry: &str, product: &str, quantity: u32, cents: i64) -> CartItem {
        let mut item = CartItem::new(
            CartSource::Server(CartEntryId::new(entry)),
            ProductId::new(product),
            quantity,
        );
        item.price = Price::usd(Decimal::new(cents, 2));
        item
    }

    #[test]
    fn test_item_id_follows_source() {
        let server = server_item("e1", "p1", 1, 100);
        assert_eq!(server.id(), "e1");

        let fallback = CartItem::new(CartSource::Fallback, ProductId::new("p1"), 1);
        assert_eq!(fallback.id(), "p1");
        assert_eq!(fallback.id(), fallback.product_id.as_str());
    }

    #[test]
    fn test_server_item_with_matching_ids_is_still_server() {
        // An entry ID that happens to equal the product ID must not flip the mode.
        let item = server_item("p1", "p1", 1, 100);
        assert!(!item.source.is_fallback());
    }

    #[test]
    fn test_new_raises_zero_quantity() {
        let item = CartItem::new(CartSource::Fallback, ProductId::new("p1"), 0);
        assert_eq!(item.quantity(), 1);
    }

    #[test]
    fn test_adjusted_quantity_rejects_below_one() {
        let item = server_item("e1", "p1", 1, 100);
        assert_eq!(
            item.adjusted_quantity(-1),
            Err(QuantityError::BelowMinimum { requested: 0 })
        );
        assert_eq!(item.adjusted_quantity(2), Ok(3));
    }

    #[test]
    fn test_set_quantity_rejects_zero() {
        let mut item = server_item("e1", "p1", 2, 100);
        assert!(item.set_quantity(0).is_err());
        assert_eq!(item.quantity(), 2);
    }

    #[test]
    fn test_cart_totals() {
        let cart = Cart::new(vec![
            server_item("e1", "p1", 2, 1050),
            server_item("e2", "p2", 1, 400),
        ]);
        assert_eq!(cart.total_quantity(), 3);
        assert_eq!(cart.subtotal().amount, Decimal::new(2500, 2));
        assert_eq!(cart.subtotal().to_string(), "$25.00");
    }

    #[test]
    fn test_cart_remove_by_id() {
        let mut cart = Cart::new(vec![server_item("e1", "p1", 1, 100)]);
        assert!(cart.remove("missing").is_none());
        assert!(cart.remove("e1").is_some());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cached_line_quantity_defaults_to_one() {
        let line: Result<CachedLine, _> = serde_json::from_str(r#"{"product_id":"p1"}"#);
        assert_eq!(line.ok(), Some(CachedLine::new(ProductId::new("p1"), 1)));
    }
}
