//! Conversions from wire types to core cart types.

use bazaar_core::{CachedLine, CartItem, CartSource};
use tracing::warn;

use super::types::{Product, ProductSummary, ServerCart, ServerCartLine};

impl ServerCart {
    /// Map the server cart to display lines.
    ///
    /// Lines that reference no product at all are dropped.
    #[must_use]
    pub fn into_items(self) -> Vec<CartItem> {
        self.items
            .into_iter()
            .filter_map(ServerCartLine::into_item)
            .collect()
    }
}

impl ServerCartLine {
    /// Convert to a server-sourced cart item.
    #[must_use]
    pub fn into_item(self) -> Option<CartItem> {
        let summary = self.product.unwrap_or_default();
        let Some(product_id) = summary.id.clone().or(self.product_id) else {
            warn!(entry_id = %self.id, "Dropping server cart line without a product");
            return None;
        };

        let mut item = CartItem::new(
            CartSource::Server(self.id),
            product_id,
            self.quantity.unwrap_or(1),
        );
        apply_summary(&mut item, summary);
        Some(item)
    }
}

impl Product {
    /// Build a fallback cart item from a cached line and this product's detail.
    #[must_use]
    pub fn into_fallback_item(self, line: &CachedLine) -> CartItem {
        let mut item = CartItem::new(CartSource::Fallback, line.product_id.clone(), line.quantity);
        apply_summary(
            &mut item,
            ProductSummary {
                id: Some(self.id),
                title: self.title,
                category: self.category,
                images: self.images,
                price: self.price,
            },
        );
        item
    }
}

/// Copy the denormalized display fields onto a cart item.
fn apply_summary(item: &mut CartItem, summary: ProductSummary) {
    if let Some(title) = summary.title.filter(|t| !t.is_empty()) {
        item.title = title;
    }
    item.category = summary.category.unwrap_or_default();
    item.image = summary.images.into_iter().find(|url| !url.is_empty());
    item.price = summary.price;
}
