//! Wire types for the marketplace REST API.
//!
//! These mirror the JSON the API sends and accepts. The server is loose
//! about optional fields and price formats, so deserialization here is
//! lenient; conversion into the strict [`bazaar_core`] types happens in
//! `conversions`.

use bazaar_core::{CartEntryId, Price, ProductId, UserId, UserRole};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// =============================================================================
// Profile
// =============================================================================

/// The signed-in user (`GET /auth/profile`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub role: UserRole,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "full_name")]
    pub name: Option<String>,
}

// =============================================================================
// Products
// =============================================================================

/// Product detail (`GET /products/{id}`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: ProductId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub price: Price,
    /// Units in stock, when the API reports it.
    #[serde(default)]
    pub stock: Option<i64>,
}

/// Product snapshot embedded in a server cart line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductSummary {
    #[serde(default, alias = "_id")]
    pub id: Option<ProductId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub price: Price,
}

// =============================================================================
// Cart
// =============================================================================

/// The server cart (`GET /products/cart`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerCart {
    /// A missing or non-array `items` field reads as an empty cart.
    #[serde(default, deserialize_with = "items_or_empty")]
    pub items: Vec<ServerCartLine>,
}

/// One server cart entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerCartLine {
    /// Server-assigned cart entry ID.
    pub id: CartEntryId,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub product: Option<ProductSummary>,
    /// Present on older responses that don't embed the product.
    #[serde(default)]
    pub product_id: Option<ProductId>,
}

/// Body of `POST /products/cart/add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Response of `POST /products/cart/add`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AddToCartResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub cart_item_id: Option<CartEntryId>,
}

// =============================================================================
// Checkout
// =============================================================================

/// What is being paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutKind {
    Product,
    Service,
}

/// One line of a checkout request. `id` is the product ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub id: ProductId,
    pub quantity: u32,
}

/// Body of `POST /checkout/create-session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutLine>,
    #[serde(rename = "type")]
    pub kind: CheckoutKind,
}

/// Response of `POST /checkout/create-session`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub checkout_url: Option<String>,
}

impl CheckoutSession {
    /// The payment page to redirect to: `url`, else `checkout_url`.
    #[must_use]
    pub fn redirect_url(&self) -> Option<&str> {
        [self.url.as_deref(), self.checkout_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|url| !url.is_empty())
    }
}

// =============================================================================
// Lenient deserializers
// =============================================================================

/// Accept a price as a JSON number, a formatted string (`"$900"`), or null.
fn deserialize_price<'de, D>(deserializer: D) -> Result<Price, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => {
            let amount = n
                .to_string()
                .parse::<Decimal>()
                .ok()
                .or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok()))
                .unwrap_or(Decimal::ZERO);
            Price::usd(amount)
        }
        Some(Value::String(s)) => Price::parse_lenient(&s),
        _ => Price::zero(),
    })
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn items_or_empty<'de, D>(deserializer: D) -> Result<Vec<ServerCartLine>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(items @ Value::Array(_)) => {
            serde_json::from_value(items).map_err(serde::de::Error::custom)
        }
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_server_cart_shape() {
        let body = r#"{"items": [{
            "id": "e1",
            "quantity": 2,
            "product": {"id": "p1", "title": "Lamp", "category": "home",
                        "images": ["https://img/1.jpg"], "price": 12.5}
        }], "total": 25}"#;
        let cart: ServerCart = serde_json::from_str(body).unwrap();
        assert_eq!(cart.items.len(), 1);

        let line = &cart.items[0];
        assert_eq!(line.id, CartEntryId::new("e1"));
        assert_eq!(line.quantity, Some(2));
        let product = line.product.as_ref().unwrap();
        assert_eq!(product.price.amount, Decimal::new(125, 1));
    }

    #[test]
    fn test_non_array_items_is_empty_cart() {
        let cart: ServerCart = serde_json::from_str(r#"{"items": null}"#).unwrap();
        assert!(cart.items.is_empty());

        let cart: ServerCart = serde_json::from_str(r#"{"items": "oops"}"#).unwrap();
        assert!(cart.items.is_empty());

        let cart: ServerCart = serde_json::from_str("{}").unwrap();
        assert!(cart.items.is_empty());
    }

    #[test]
    fn test_product_accepts_underscore_id_and_string_price() {
        let body = r#"{"_id": "p9", "title": "Desk", "price": "$900", "images": null, "stock": 3}"#;
        let product: Product = serde_json::from_str(body).unwrap();
        assert_eq!(product.id, ProductId::new("p9"));
        assert_eq!(product.price.amount, Decimal::from(900));
        assert!(product.images.is_empty());
        assert_eq!(product.stock, Some(3));
    }

    #[test]
    fn test_missing_price_is_zero() {
        let product: Product = serde_json::from_str(r#"{"id": "p1"}"#).unwrap();
        assert_eq!(product.price, Price::zero());
    }

    #[test]
    fn test_checkout_request_wire_format() {
        let request = CheckoutRequest {
            items: vec![CheckoutLine {
                id: ProductId::new("p1"),
                quantity: 2,
            }],
            kind: CheckoutKind::Product,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"items": [{"id": "p1", "quantity": 2}], "type": "product"})
        );
    }

    #[test]
    fn test_redirect_url_prefers_url() {
        let session = CheckoutSession {
            session_id: None,
            url: Some("https://pay.example/abc".to_string()),
            checkout_url: Some("https://pay.example/other".to_string()),
        };
        assert_eq!(session.redirect_url(), Some("https://pay.example/abc"));
    }

    #[test]
    fn test_redirect_url_falls_back_to_checkout_url() {
        let session: CheckoutSession =
            serde_json::from_str(r#"{"url": "", "checkout_url": "https://pay.example/x"}"#)
                .unwrap();
        assert_eq!(session.redirect_url(), Some("https://pay.example/x"));
    }

    #[test]
    fn test_redirect_url_missing() {
        let session: CheckoutSession = serde_json::from_str(r#"{"session_id": "s1"}"#).unwrap();
        assert_eq!(session.redirect_url(), None);
    }
}
