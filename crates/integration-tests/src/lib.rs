//! Integration tests for cartsync.
//!
//! Provides [`FakeCartServer`], an in-process cart API served by axum on an
//! ephemeral port. It speaks the same envelope as the real API and answers in
//! the real API's field names (`id`, `qty`, `title`, `variantTitle`,
//! `price.amount`), so the client's normalization runs end to end.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cartsync-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Token the fake server accepts.
pub const VALID_TOKEN: &str = "valid-token";

/// Seconds reported in `Retry-After` when rate limiting.
pub const RETRY_AFTER_SECS: u64 = 7;

/// Product data the server attaches to lines it creates.
#[derive(Debug, Clone)]
pub struct Product {
    pub title: String,
    pub variant_title: Option<String>,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerLine {
    id: String,
    qty: u32,
    title: String,
    variant_title: Option<String>,
    price: Money,
}

#[derive(Debug, Clone, Serialize)]
struct Money {
    amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct AddLineRequest {
    sku: String,
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct UpdateQuantityRequest {
    quantity: u32,
}

#[derive(Default)]
struct ServerState {
    lines: Mutex<Vec<ServerLine>>,
    catalog: Mutex<HashMap<String, Product>>,
    failing: Mutex<HashSet<String>>,
    requests: Mutex<Vec<String>>,
    rate_limit_next: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An in-process cart API. Shut down on drop.
pub struct FakeCartServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    handle: JoinHandle<()>,
}

impl FakeCartServer {
    /// Bind to an ephemeral local port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(ServerState::default());
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let app = router(Arc::clone(&state));
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// Base URL for the client configuration.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Register product data for `sku`.
    pub fn add_product(&self, sku: &str, title: &str, variant_title: Option<&str>, price: Decimal) {
        lock(&self.state.catalog).insert(
            sku.to_string(),
            Product {
                title: title.to_string(),
                variant_title: variant_title.map(ToString::to_string),
                price,
            },
        );
    }

    /// Answer add-line calls for `sku` with a 503.
    pub fn fail_sku(&self, sku: &str) {
        lock(&self.state.failing).insert(sku.to_string());
    }

    pub fn heal_sku(&self, sku: &str) {
        lock(&self.state.failing).remove(sku);
    }

    /// Answer the next request with 429.
    pub fn rate_limit_next(&self) {
        self.state.rate_limit_next.store(true, Ordering::SeqCst);
    }

    /// Put a line straight into the server cart.
    pub fn seed_line(&self, sku: &str, quantity: u32) {
        let line = new_line(&self.state, sku, quantity);
        lock(&self.state.lines).push(line);
    }

    /// SKU and quantity of every server line, in cart order.
    #[must_use]
    pub fn quantities(&self) -> Vec<(String, u32)> {
        lock(&self.state.lines)
            .iter()
            .map(|line| (line.id.clone(), line.qty))
            .collect()
    }

    /// Requests received so far, as `METHOD /path`.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        lock(&self.state.requests).clone()
    }
}

impl Drop for FakeCartServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", axum::routing::post(add_line))
        .route("/cart/items/{sku}", patch(update_quantity).delete(remove_line))
        .with_state(state)
}

fn new_line(state: &ServerState, sku: &str, quantity: u32) -> ServerLine {
    let product = lock(&state.catalog).get(sku).cloned();
    ServerLine {
        id: sku.to_string(),
        qty: quantity,
        title: product
            .as_ref()
            .map(|p| p.title.clone())
            .unwrap_or_default(),
        variant_title: product.as_ref().and_then(|p| p.variant_title.clone()),
        price: Money {
            amount: product.map(|p| p.price).unwrap_or_default(),
        },
    }
}

/// Envelope with the current cart as `data.items`.
fn cart_response(state: &ServerState) -> Response {
    let items = lock(&state.lines).clone();
    Json(json!({ "data": { "items": items }, "message": null, "errors": null })).into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "data": null, "message": message, "errors": null })),
    )
        .into_response()
}

/// Record the request, then enforce rate limiting and the bearer token.
fn admit(state: &ServerState, headers: &HeaderMap, request: String) -> Result<(), Response> {
    lock(&state.requests).push(request);

    if state.rate_limit_next.swap(false, Ordering::SeqCst) {
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, RETRY_AFTER_SECS.to_string())],
            Json(json!({ "data": null, "message": "Slow down" })),
        )
            .into_response());
    }

    let expected = format!("Bearer {VALID_TOKEN}");
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if authorized {
        Ok(())
    } else {
        Err(error_response(StatusCode::UNAUTHORIZED, "Invalid token"))
    }
}

async fn get_cart(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    if let Err(response) = admit(&state, &headers, "GET /cart".to_string()) {
        return response;
    }
    cart_response(&state)
}

async fn clear_cart(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    if let Err(response) = admit(&state, &headers, "DELETE /cart".to_string()) {
        return response;
    }
    lock(&state.lines).clear();
    cart_response(&state)
}

async fn add_line(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = admit(&state, &headers, "POST /cart/items".to_string()) {
        return response;
    }

    let Ok(request) = serde_json::from_value::<AddLineRequest>(body) else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "data": null, "errors": { "quantity": ["is invalid"] } })),
        )
            .into_response();
    };
    if request.quantity == 0 {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "Quantity must be positive");
    }
    if lock(&state.failing).contains(&request.sku) {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "Inventory service unavailable");
    }

    {
        let mut lines = lock(&state.lines);
        if let Some(line) = lines.iter_mut().find(|l| l.id == request.sku) {
            line.qty = line.qty.saturating_add(request.quantity);
        } else {
            let line = new_line(&state, &request.sku, request.quantity);
            lines.push(line);
        }
    }
    cart_response(&state)
}

async fn update_quantity(
    State(state): State<Arc<ServerState>>,
    Path(sku): Path<String>,
    headers: HeaderMap,
    Json(body): Json<UpdateQuantityRequest>,
) -> Response {
    if let Err(response) = admit(&state, &headers, format!("PATCH /cart/items/{sku}")) {
        return response;
    }

    {
        let mut lines = lock(&state.lines);
        let Some(line) = lines.iter_mut().find(|l| l.id == sku) else {
            return error_response(StatusCode::NOT_FOUND, "Line not found");
        };
        line.qty = body.quantity;
        lines.retain(|l| l.qty > 0);
    }
    cart_response(&state)
}

async fn remove_line(
    State(state): State<Arc<ServerState>>,
    Path(sku): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = admit(&state, &headers, format!("DELETE /cart/items/{sku}")) {
        return response;
    }
    lock(&state.lines).retain(|l| l.id != sku);
    cart_response(&state)
}
