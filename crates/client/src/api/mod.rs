//! Marketplace REST API client.
//!
//! # Architecture
//!
//! - [`MarketplaceApi`] is the seam the cart controller talks to; tests swap
//!   in an in-memory implementation
//! - [`HttpMarketplaceApi`] is the `reqwest` implementation against the live API
//! - The server is the source of truth for the cart; only product details
//!   are cached in memory (via `moka`)
//!
//! # Endpoints
//!
//! - `GET /auth/profile` - signed-in user
//! - `GET /products/cart`, `POST /products/cart/add`, `DELETE /products/cart/{id}`
//! - `GET /products/{id}` - product detail
//! - `POST /checkout/create-session` - payment redirect
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_client::api::{HttpMarketplaceApi, MarketplaceApi};
//!
//! let api = HttpMarketplaceApi::new(&config)?;
//! let profile = api.profile().await?;
//! let cart = api.cart().await?;
//! ```

mod conversions;
mod http;
pub mod types;

pub use http::HttpMarketplaceApi;
pub use types::*;

use async_trait::async_trait;
use bazaar_core::{CartEntryId, ProductId};
use serde_json::Value;
use thiserror::Error;

/// Operations the cart flow consumes from the marketplace API.
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    /// Fetch the signed-in user's profile.
    async fn profile(&self) -> Result<UserProfile, ApiError>;

    /// Fetch the server cart.
    async fn cart(&self) -> Result<ServerCart, ApiError>;

    /// Add a product to the server cart (creates or merges the entry).
    async fn add_to_cart(&self, request: &AddToCartRequest)
    -> Result<AddToCartResponse, ApiError>;

    /// Delete a server cart entry.
    async fn remove_from_cart(&self, entry_id: &CartEntryId) -> Result<(), ApiError>;

    /// Fetch product detail.
    async fn product(&self, product_id: &ProductId) -> Result<Product, ApiError>;

    /// Create a payment checkout session.
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, ApiError>;
}

/// Errors that can occur when talking to the marketplace API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (connection refused, DNS, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The bearer token is missing, invalid, or expired.
    #[error("Unauthorized: please sign in again")]
    Unauthorized {
        /// Parsed `detail` field of the error body.
        detail: Option<ErrorDetail>,
    },

    /// Resource not found.
    #[error("Not found: {resource}")]
    NotFound {
        /// Server detail message, or the request path when there is none.
        resource: String,
        /// Parsed `detail` field of the error body.
        detail: Option<ErrorDetail>,
    },

    /// Non-success status with an optional server-provided detail.
    #[error("Server returned {status}: {}", format_detail(.detail.as_ref()))]
    Status {
        /// HTTP status code.
        status: u16,
        /// Parsed `detail` field of the error body.
        detail: Option<ErrorDetail>,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configured base URL cannot have path segments appended.
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    /// A configured value cannot be sent as a header (e.g. a token with newlines).
    #[error("Invalid request header: {0}")]
    InvalidHeader(String),
}

impl ApiError {
    /// Whether the server reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Status { status: 404, .. })
    }

    /// The server-provided detail message, if the error carried one.
    #[must_use]
    pub fn detail_message(&self) -> Option<String> {
        match self {
            Self::Status {
                detail: Some(detail),
                ..
            }
            | Self::NotFound {
                detail: Some(detail),
                ..
            }
            | Self::Unauthorized {
                detail: Some(detail),
            } => detail.message(),
            _ => None,
        }
    }
}

/// The `detail` field of an API error body.
///
/// Validation failures arrive as a list of field errors, everything else
/// as a plain string; a few handlers send an object.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetail {
    /// `"detail": "Only buyers can checkout"`
    Message(String),
    /// `"detail": [{"loc": [...], "msg": "field required"}]`
    List(Vec<Value>),
    /// `"detail": {"msg": "..."}`
    Object(serde_json::Map<String, Value>),
}

impl ErrorDetail {
    /// Extract the detail from a raw error body, if it has one.
    #[must_use]
    pub fn from_body(body: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(body).ok()?;
        match value.get("detail")? {
            Value::String(message) => Some(Self::Message(message.clone())),
            Value::Array(items) => Some(Self::List(items.clone())),
            Value::Object(map) => Some(Self::Object(map.clone())),
            _ => None,
        }
    }

    /// Collapse the detail into a single user-facing message.
    ///
    /// List entries contribute their string value or `msg` field, joined with
    /// `", "`. Returns `None` when nothing usable is present.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        let message = match self {
            Self::Message(message) => message.trim().to_string(),
            Self::List(items) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.as_str()),
                    other => other.get("msg").and_then(Value::as_str),
                })
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
            Self::Object(map) => map
                .get("msg")
                .or_else(|| map.get("message"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        };

        (!message.is_empty()).then_some(message)
    }
}

fn format_detail(detail: Option<&ErrorDetail>) -> String {
    detail
        .and_then(ErrorDetail::message)
        .unwrap_or_else(|| "(no error details provided)".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_string() {
        let detail = ErrorDetail::from_body(r#"{"detail": "Only buyers can checkout"}"#);
        assert_eq!(
            detail.and_then(|d| d.message()).as_deref(),
            Some("Only buyers can checkout")
        );
    }

    #[test]
    fn test_detail_list_of_field_errors() {
        let body = r#"{"detail": [
            {"loc": ["body", "items"], "msg": "field required"},
            {"loc": ["body", "type"], "msg": "invalid type"},
            {"loc": ["body"]}
        ]}"#;
        let detail = ErrorDetail::from_body(body);
        assert_eq!(
            detail.and_then(|d| d.message()).as_deref(),
            Some("field required, invalid type")
        );
    }

    #[test]
    fn test_detail_list_without_messages_is_none() {
        let detail = ErrorDetail::from_body(r#"{"detail": [{"loc": ["body"]}]}"#);
        assert!(detail.is_some_and(|d| d.message().is_none()));
    }

    #[test]
    fn test_detail_object() {
        let detail = ErrorDetail::from_body(r#"{"detail": {"message": "Out of stock"}}"#);
        assert_eq!(
            detail.and_then(|d| d.message()).as_deref(),
            Some("Out of stock")
        );
    }

    #[test]
    fn test_body_without_detail() {
        assert!(ErrorDetail::from_body(r#"{"error": "boom"}"#).is_none());
        assert!(ErrorDetail::from_body("<html>502</html>").is_none());
    }

    #[test]
    fn test_status_error_display() {
        let err = ApiError::Status {
            status: 400,
            detail: Some(ErrorDetail::Message("No items provided".to_string())),
        };
        assert_eq!(err.to_string(), "Server returned 400: No items provided");
        assert_eq!(err.detail_message().as_deref(), Some("No items provided"));

        let bare = ApiError::Status {
            status: 503,
            detail: None,
        };
        assert_eq!(
            bare.to_string(),
            "Server returned 503: (no error details provided)"
        );
    }

    #[test]
    fn test_detail_message_from_not_found_and_unauthorized() {
        let not_found = ApiError::NotFound {
            resource: "Product p9 not found".to_string(),
            detail: ErrorDetail::from_body(r#"{"detail": "Product p9 not found"}"#),
        };
        assert_eq!(
            not_found.detail_message().as_deref(),
            Some("Product p9 not found")
        );

        let unauthorized = ApiError::Unauthorized {
            detail: ErrorDetail::from_body(r#"{"detail": "Only buyers can checkout"}"#),
        };
        assert_eq!(
            unauthorized.detail_message().as_deref(),
            Some("Only buyers can checkout")
        );

        let bare = ApiError::NotFound {
            resource: "/api/products/p9".to_string(),
            detail: None,
        };
        assert_eq!(bare.detail_message(), None);
    }

    #[test]
    fn test_not_found_detection() {
        assert!(
            ApiError::NotFound {
                resource: "cart entry".to_string(),
                detail: None
            }
            .is_not_found()
        );
        assert!(
            ApiError::Status {
                status: 404,
                detail: None
            }
            .is_not_found()
        );
        assert!(!ApiError::Unauthorized { detail: None }.is_not_found());
    }
}
