//! Local fallback cache for a user's cart.
//!
//! Holds `{product_id, quantity}` pairs under `cart_cache_{user_id}` so the
//! cart can still be shown when the server cart endpoint is unreachable.
//! It is filled on every successful add-to-cart and cleared as soon as a
//! server load succeeds.

use bazaar_core::{CachedLine, ProductId, UserId};
use tracing::warn;

use crate::store::{KeyValueStore, StoreError};

/// Fallback cart cache scoped to one user.
#[derive(Debug)]
pub struct CartCache<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> CartCache<S> {
    /// Create the cache for `user_id` on top of `store`.
    pub fn new(store: S, user_id: &UserId) -> Self {
        Self {
            store,
            key: Self::key_for(user_id),
        }
    }

    /// Storage key used for `user_id`.
    #[must_use]
    pub fn key_for(user_id: &UserId) -> String {
        format!("cart_cache_{user_id}")
    }

    /// Storage key of this cache.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Read the cached lines. A missing key reads as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the stored value is not a JSON
    /// array of lines.
    pub fn lines(&self) -> Result<Vec<CachedLine>, StoreError> {
        match self.store.get(&self.key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Record a successful add: bump the quantity of an existing line or
    /// append a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn record_add(&self, product_id: &ProductId, quantity: u32) -> Result<(), StoreError> {
        let mut lines = self.lines_for_update()?;
        match lines.iter_mut().find(|l| &l.product_id == product_id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => lines.push(CachedLine::new(product_id.clone(), quantity)),
        }
        self.write(&lines)
    }

    /// Overwrite the quantity of a cached line.
    ///
    /// Returns whether a line for `product_id` was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn set_quantity(&self, product_id: &ProductId, quantity: u32) -> Result<bool, StoreError> {
        let mut lines = self.lines_for_update()?;
        let found = match lines.iter_mut().find(|l| &l.product_id == product_id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        };
        self.write(&lines)?;
        Ok(found)
    }

    /// Drop the cached line for `product_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn remove(&self, product_id: &ProductId) -> Result<(), StoreError> {
        let mut lines = self.lines_for_update()?;
        lines.retain(|l| &l.product_id != product_id);
        self.write(&lines)
    }

    /// Forget every cached line.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(&self.key)
    }

    /// Current lines for a read-modify-write. A corrupt blob is discarded.
    fn lines_for_update(&self) -> Result<Vec<CachedLine>, StoreError> {
        match self.lines() {
            Err(StoreError::Serialization(e)) => {
                warn!(key = %self.key, error = %e, "Discarding unreadable cart cache");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    fn write(&self, lines: &[CachedLine]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(lines)?;
        self.store.set(&self.key, &raw)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn cache() -> CartCache<MemoryStore> {
        CartCache::new(MemoryStore::new(), &UserId::new("u1"))
    }

    #[test]
    fn test_key_is_scoped_to_user() {
        assert_eq!(cache().key(), "cart_cache_u1");
    }

    #[test]
    fn test_missing_key_is_empty() {
        assert!(cache().lines().unwrap().is_empty());
    }

    #[test]
    fn test_record_add_merges_quantities() {
        let cache = cache();
        let p1 = ProductId::new("p1");
        cache.record_add(&p1, 1).unwrap();
        cache.record_add(&ProductId::new("p2"), 4).unwrap();
        cache.record_add(&p1, 2).unwrap();

        assert_eq!(
            cache.lines().unwrap(),
            vec![
                CachedLine::new(p1, 3),
                CachedLine::new(ProductId::new("p2"), 4),
            ]
        );
    }

    #[test]
    fn test_stored_format() {
        let cache = cache();
        cache.record_add(&ProductId::new("p1"), 2).unwrap();
        assert_eq!(
            cache.store().get("cart_cache_u1").unwrap().as_deref(),
            Some(r#"[{"product_id":"p1","quantity":2}]"#)
        );
    }

    #[test]
    fn test_set_quantity_and_remove() {
        let cache = cache();
        let p1 = ProductId::new("p1");
        cache.record_add(&p1, 1).unwrap();

        assert!(cache.set_quantity(&p1, 5).unwrap());
        assert_eq!(cache.lines().unwrap()[0].quantity, 5);
        assert!(!cache.set_quantity(&ProductId::new("nope"), 5).unwrap());

        cache.remove(&p1).unwrap();
        assert!(cache.lines().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_blob_is_an_error_on_read_and_reset_on_write() {
        let cache = cache();
        cache.store().set("cart_cache_u1", "{not json").unwrap();
        assert!(matches!(cache.lines(), Err(StoreError::Serialization(_))));

        cache.record_add(&ProductId::new("p1"), 1).unwrap();
        assert_eq!(cache.lines().unwrap().len(), 1);
    }

    #[test]
    fn test_clear() {
        let cache = cache();
        cache.record_add(&ProductId::new("p1"), 1).unwrap();
        cache.clear().unwrap();
        assert!(cache.lines().unwrap().is_empty());
        assert_eq!(cache.store().get("cart_cache_u1").unwrap(), None);
    }
}
