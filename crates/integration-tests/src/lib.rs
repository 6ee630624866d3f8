//! End-to-end test support for the Bazaar cart client.
//!
//! [`StubMarketplace`] serves the subset of the marketplace REST API the cart
//! uses from memory, on an ephemeral local port. Tests point a real
//! [`bazaar_client::HttpMarketplaceApi`] at it and can take the cart endpoint
//! down to exercise the fallback path.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{OriginalUri, Path as UrlPath, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use bazaar_client::ClientConfig;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

/// Bearer token the stub accepts.
pub const STUB_TOKEN: &str = "stub-Tk9r2vQx7LmZ4pWs8Yd3";

/// User ID the stub signs everyone in as.
pub const STUB_USER_ID: &str = "u1";

#[derive(Debug, Clone)]
pub struct StubEntry {
    pub entry_id: String,
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Default)]
struct StubState {
    role: String,
    products: HashMap<String, Value>,
    entries: Vec<StubEntry>,
    cart_down: bool,
    checkout_url: Option<String>,
    checkout_bodies: Vec<Value>,
    requests: Vec<String>,
    next_entry: u32,
}

type Shared = Arc<Mutex<StubState>>;

/// In-memory marketplace API.
pub struct StubMarketplace {
    addr: SocketAddr,
    state: Shared,
    handle: JoinHandle<()>,
}

impl StubMarketplace {
    /// Start the stub on `127.0.0.1` with an ephemeral port.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(StubState {
            role: "buyer".to_string(),
            checkout_url: Some("https://pay.example/session/cs_test".to_string()),
            ..StubState::default()
        }));

        let api = Router::new()
            .route("/auth/profile", get(profile))
            .route("/products/cart", get(cart))
            .route("/products/cart/add", post(add_to_cart))
            .route("/products/cart/{entry_id}", delete(remove_from_cart))
            .route("/products/{product_id}", get(product))
            .route("/checkout/create-session", post(create_checkout_session))
            .layer(middleware::from_fn_with_state(state.clone(), authorize));

        let app = Router::new().nest("/api", api).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Base URL of the stub API.
    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Client configuration for a signed-in user keeping state in `state_dir`.
    pub fn config(&self, state_dir: &Path) -> ClientConfig {
        self.config_with_token(state_dir, STUB_TOKEN)
    }

    /// Client configuration with an arbitrary bearer token.
    pub fn config_with_token(&self, state_dir: &Path, token: &str) -> ClientConfig {
        let vars: HashMap<&str, String> = HashMap::from([
            ("BAZAAR_API_URL", self.api_url()),
            ("BAZAAR_API_TOKEN", token.to_string()),
            ("BAZAAR_API_TIMEOUT_SECS", "5".to_string()),
            ("BAZAAR_STATE_DIR", state_dir.display().to_string()),
        ]);
        ClientConfig::from_lookup(move |key: &str| vars.get(key).cloned()).unwrap()
    }

    fn state(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap()
    }

    /// Register a product in the catalog.
    pub fn add_product(&self, id: &str, title: &str, price: f64, stock: Option<i64>) {
        self.state().products.insert(
            id.to_string(),
            json!({
                "id": id,
                "title": title,
                "category": "home",
                "images": [format!("https://img.example/{id}.jpg")],
                "price": price,
                "stock": stock,
            }),
        );
    }

    /// Drop a product from the catalog.
    pub fn remove_product(&self, id: &str) {
        self.state().products.remove(id);
    }

    /// Change the signed-in user's role.
    pub fn set_role(&self, role: &str) {
        self.state().role = role.to_string();
    }

    /// Make `GET /products/cart` fail with 503.
    pub fn set_cart_down(&self, down: bool) {
        self.state().cart_down = down;
    }

    /// Set the URL returned by checkout, or return none at all.
    pub fn set_checkout_url(&self, url: Option<&str>) {
        self.state().checkout_url = url.map(str::to_string);
    }

    /// Current server cart entries.
    pub fn entries(&self) -> Vec<StubEntry> {
        self.state().entries.clone()
    }

    /// Bodies received by the checkout endpoint.
    pub fn checkout_bodies(&self) -> Vec<Value> {
        self.state().checkout_bodies.clone()
    }

    /// `METHOD /path` of every request received so far.
    pub fn requests(&self) -> Vec<String> {
        self.state().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.state().requests.clear();
    }
}

impl Drop for StubMarketplace {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// =============================================================================
// Handlers
// =============================================================================

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

async fn authorize(State(state): State<Shared>, request: Request, next: Next) -> Response {
    // Nested routes see a stripped URI; log the path the client sent
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map_or_else(|| request.uri().path().to_string(), |uri| uri.path().to_string());
    let line = format!("{} {path}", request.method());
    state.lock().unwrap().requests.push(line);

    let expected = format!("Bearer {STUB_TOKEN}");
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
    }

    next.run(request).await
}

async fn profile(State(state): State<Shared>) -> Json<Value> {
    let state = state.lock().unwrap();
    Json(json!({
        "id": STUB_USER_ID,
        "role": state.role,
        "email": "buyer@bazaar.test",
        "full_name": "Test Buyer",
    }))
}

async fn cart(State(state): State<Shared>) -> Response {
    let state = state.lock().unwrap();
    if state.cart_down {
        return detail(StatusCode::SERVICE_UNAVAILABLE, "Cart service unavailable");
    }

    let items: Vec<Value> = state
        .entries
        .iter()
        .map(|entry| {
            json!({
                "id": entry.entry_id,
                "quantity": entry.quantity,
                "product": state.products.get(&entry.product_id),
                "product_id": entry.product_id,
            })
        })
        .collect();
    Json(json!({ "items": items })).into_response()
}

#[derive(Deserialize)]
struct AddBody {
    product_id: String,
    quantity: u32,
}

async fn add_to_cart(State(state): State<Shared>, Json(body): Json<AddBody>) -> Response {
    let mut state = state.lock().unwrap();
    if !state.products.contains_key(&body.product_id) {
        return detail(StatusCode::NOT_FOUND, "Product not found");
    }

    if let Some(entry) = state
        .entries
        .iter_mut()
        .find(|e| e.product_id == body.product_id)
    {
        entry.quantity += body.quantity;
        let id = entry.entry_id.clone();
        return Json(json!({ "message": "Cart updated", "cart_item_id": id })).into_response();
    }

    state.next_entry += 1;
    let entry_id = format!("ci_{}", state.next_entry);
    state.entries.push(StubEntry {
        entry_id: entry_id.clone(),
        product_id: body.product_id,
        quantity: body.quantity,
    });
    Json(json!({ "message": "Item added to cart", "cart_item_id": entry_id })).into_response()
}

async fn remove_from_cart(
    State(state): State<Shared>,
    UrlPath(entry_id): UrlPath<String>,
) -> Response {
    let mut state = state.lock().unwrap();
    let before = state.entries.len();
    state.entries.retain(|e| e.entry_id != entry_id);
    if state.entries.len() == before {
        return detail(StatusCode::NOT_FOUND, "Cart item not found");
    }
    Json(json!({ "message": "Item removed" })).into_response()
}

async fn product(State(state): State<Shared>, UrlPath(product_id): UrlPath<String>) -> Response {
    let state = state.lock().unwrap();
    match state.products.get(&product_id) {
        Some(product) => Json(product.clone()).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Product not found"),
    }
}

async fn create_checkout_session(
    State(state): State<Shared>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    let empty = body
        .get("items")
        .and_then(Value::as_array)
        .is_none_or(Vec::is_empty);
    let missing = body
        .get("items")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| item.get("id").and_then(Value::as_str))
        .find(|id| !state.products.contains_key(*id))
        .map(str::to_string);
    state.checkout_bodies.push(body);
    if empty {
        return detail(StatusCode::BAD_REQUEST, "No items provided");
    }
    if let Some(id) = missing {
        return detail(StatusCode::NOT_FOUND, &format!("Product {id} not found"));
    }

    match &state.checkout_url {
        Some(url) => Json(json!({ "session_id": "cs_test", "url": url })).into_response(),
        None => Json(json!({ "session_id": "cs_test" })).into_response(),
    }
}
