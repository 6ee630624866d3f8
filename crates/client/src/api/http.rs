//! `reqwest` implementation of [`MarketplaceApi`].
//!
//! Every request shares one client, so one timeout and one set of default
//! headers (bearer token, no-cache directives). Product details are cached
//! using `moka`; cart state never is.

use std::sync::Arc;

use async_trait::async_trait;
use bazaar_core::{CartEntryId, ProductId};
use moka::future::Cache;
use reqwest::header::{AUTHORIZATION, CACHE_CONTROL, EXPIRES, HeaderMap, HeaderValue, PRAGMA};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::types::{
    AddToCartRequest, AddToCartResponse, CheckoutRequest, CheckoutSession, Product, ServerCart,
    UserProfile,
};
use super::{ApiError, ErrorDetail, MarketplaceApi};
use crate::config::ClientConfig;

/// Maximum number of product details held in memory.
const PRODUCT_CACHE_CAPACITY: u64 = 1000;

/// Longest slice of a response body written to logs.
const LOGGED_BODY_CHARS: usize = 500;

// =============================================================================
// HttpMarketplaceApi
// =============================================================================

/// Client for the marketplace REST API.
#[derive(Clone)]
pub struct HttpMarketplaceApi {
    inner: Arc<HttpMarketplaceApiInner>,
}

struct HttpMarketplaceApiInner {
    client: reqwest::Client,
    base_url: Url,
    products: Cache<ProductId, Product>,
}

impl HttpMarketplaceApi {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be used as a header value or the
    /// underlying HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        );
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(EXPIRES, HeaderValue::from_static("0"));

        if let Some(token) = config.bearer_token() {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ApiError::InvalidHeader(e.to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        let products = Cache::builder()
            .max_capacity(PRODUCT_CACHE_CAPACITY)
            .time_to_live(config.product_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(HttpMarketplaceApiInner {
                client,
                base_url: config.api_url.clone(),
                products,
            }),
        })
    }

    /// Build an endpoint URL from path segments, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and return the body of a successful response.
    async fn execute<B: Serialize + Sync>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<String, ApiError> {
        let url = self.endpoint(segments)?;
        let mut request = self.inner.client.request(method, url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if status.is_success() {
            return Ok(response_text);
        }

        let detail = ErrorDetail::from_body(&response_text);
        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized { detail }),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound {
                resource: detail
                    .as_ref()
                    .and_then(ErrorDetail::message)
                    .unwrap_or_else(|| url.path().to_string()),
                detail,
            }),
            _ => {
                tracing::error!(
                    status = %status,
                    url = %url,
                    body = %truncate(&response_text),
                    "Marketplace API returned non-success status"
                );
                Err(ApiError::Status {
                    status: status.as_u16(),
                    detail,
                })
            }
        }
    }

    /// Send a request and parse the JSON body of a successful response.
    async fn execute_json<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response_text = self.execute(method, segments, body).await?;
        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&response_text),
                "Failed to parse marketplace API response"
            );
            ApiError::Parse(e)
        })
    }
}

#[async_trait]
impl MarketplaceApi for HttpMarketplaceApi {
    #[instrument(skip(self))]
    async fn profile(&self) -> Result<UserProfile, ApiError> {
        self.execute_json::<(), _>(Method::GET, &["auth", "profile"], None)
            .await
    }

    #[instrument(skip(self))]
    async fn cart(&self) -> Result<ServerCart, ApiError> {
        self.execute_json::<(), _>(Method::GET, &["products", "cart"], None)
            .await
    }

    #[instrument(skip(self, request), fields(product_id = %request.product_id, quantity = request.quantity))]
    async fn add_to_cart(
        &self,
        request: &AddToCartRequest,
    ) -> Result<AddToCartResponse, ApiError> {
        let response_text = self
            .execute(Method::POST, &["products", "cart", "add"], Some(request))
            .await?;

        // The body is informational only; an empty or unexpected one is still a success
        Ok(serde_json::from_str(&response_text).unwrap_or_default())
    }

    #[instrument(skip(self), fields(entry_id = %entry_id))]
    async fn remove_from_cart(&self, entry_id: &CartEntryId) -> Result<(), ApiError> {
        self.execute::<()>(
            Method::DELETE,
            &["products", "cart", entry_id.as_str()],
            None,
        )
        .await
        .map(|_| ())
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn product(&self, product_id: &ProductId) -> Result<Product, ApiError> {
        if let Some(product) = self.inner.products.get(product_id).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let product: Product = self
            .execute_json::<(), _>(Method::GET, &["products", product_id.as_str()], None)
            .await?;

        self.inner
            .products
            .insert(product_id.clone(), product.clone())
            .await;

        Ok(product)
    }

    #[instrument(skip(self, request), fields(lines = request.items.len()))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, ApiError> {
        self.execute_json(
            Method::POST,
            &["checkout", "create-session"],
            Some(request),
        )
        .await
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(LOGGED_BODY_CHARS).collect()
}
