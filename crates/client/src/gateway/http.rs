//! HTTP implementation of the cart gateway.
//!
//! Uses `reqwest` against the JSON cart API. Responses share one envelope,
//! `{data, message, errors, meta}`, where `data` holds `{items: [...]}`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use cartsync_core::{BearerToken, CartLine, Sku};

use super::CartGateway;
use crate::config::ClientConfig;
use crate::error::{CartError, Result};
use crate::normalize::normalize_lines;

/// Characters of a response body kept in logs and error messages.
const MAX_BODY_PREVIEW: usize = 200;

/// Uniform response envelope of the cart API.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Value,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Value,
}

#[derive(Debug, serde::Serialize)]
struct AddLineBody<'a> {
    sku: &'a str,
    quantity: u32,
}

#[derive(Debug, serde::Serialize)]
struct UpdateQuantityBody {
    quantity: u32,
}

/// Client for the cart API.
#[derive(Clone)]
pub struct HttpCartGateway {
    inner: Arc<HttpCartGatewayInner>,
}

struct HttpCartGatewayInner {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCartGateway {
    /// Create a gateway for the API rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: Arc::new(HttpCartGatewayInner {
                client: reqwest::Client::new(),
                base_url: base_url.trim_end_matches('/').to_string(),
            }),
        }
    }

    /// Create a gateway from client configuration.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.api_base_url.as_str())
    }

    fn cart_url(&self) -> String {
        format!("{}/cart", self.inner.base_url)
    }

    fn items_url(&self) -> String {
        format!("{}/cart/items", self.inner.base_url)
    }

    fn item_url(&self, sku: &Sku) -> String {
        format!(
            "{}/cart/items/{}",
            self.inner.base_url,
            urlencoding::encode(sku.as_str())
        )
    }

    /// Send an authenticated request and decode the cart snapshot.
    async fn execute(
        &self,
        request: RequestBuilder,
        token: &BearerToken,
    ) -> Result<Vec<CartLine>> {
        let response = request
            .bearer_auth(token.expose())
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            tracing::info!("Cart API rejected credential");
            return Err(CartError::Unauthorized);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CartError::RateLimited(retry_after));
        }

        // Body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Envelope>(&response_text)
                .ok()
                .and_then(|envelope| envelope_message(&envelope))
                .unwrap_or_else(|| preview(&response_text));
            tracing::error!(
                status = %status,
                body = %preview(&response_text),
                "Cart API returned non-success status"
            );
            return Err(CartError::api(status.as_u16(), message));
        }

        let envelope: Envelope = serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %preview(&response_text),
                "Failed to parse cart API response"
            );
            CartError::Parse(e)
        })?;

        if envelope.data.is_null() {
            return Err(CartError::api(status.as_u16(), "No data in response"));
        }

        Ok(normalize_lines(&envelope.data))
    }
}

#[async_trait]
impl CartGateway for HttpCartGateway {
    #[instrument(skip(self, token))]
    async fn get_cart(&self, token: &BearerToken) -> Result<Vec<CartLine>> {
        let request = self.inner.client.get(self.cart_url());
        self.execute(request, token).await
    }

    #[instrument(skip(self, token), fields(sku = %sku))]
    async fn add_line(
        &self,
        token: &BearerToken,
        sku: &Sku,
        quantity: u32,
    ) -> Result<Vec<CartLine>> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }

        let request = self.inner.client.post(self.items_url()).json(&AddLineBody {
            sku: sku.as_str(),
            quantity,
        });
        self.execute(request, token).await
    }

    #[instrument(skip(self, token), fields(sku = %sku))]
    async fn update_quantity(
        &self,
        token: &BearerToken,
        sku: &Sku,
        quantity: u32,
    ) -> Result<Vec<CartLine>> {
        if quantity == 0 {
            return self.remove_line(token, sku).await;
        }

        let request = self
            .inner
            .client
            .patch(self.item_url(sku))
            .json(&UpdateQuantityBody { quantity });
        self.execute(request, token).await
    }

    #[instrument(skip(self, token), fields(sku = %sku))]
    async fn remove_line(&self, token: &BearerToken, sku: &Sku) -> Result<Vec<CartLine>> {
        let request = self.inner.client.delete(self.item_url(sku));
        self.execute(request, token).await
    }

    #[instrument(skip(self, token))]
    async fn clear(&self, token: &BearerToken) -> Result<Vec<CartLine>> {
        let request = self.inner.client.delete(self.cart_url());
        self.execute(request, token).await
    }
}

/// Human-readable message from an error envelope.
///
/// Prefers `message`, then `errors` (a list of strings or `{message}`
/// objects, or a map of field names to messages).
fn envelope_message(envelope: &Envelope) -> Option<String> {
    if let Some(message) = envelope.message.as_deref().filter(|m| !m.is_empty()) {
        return Some(message.to_string());
    }

    let messages = collect_error_messages(&envelope.errors);
    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

fn collect_error_messages(errors: &Value) -> Vec<String> {
    match errors {
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(collect_error_messages).collect(),
        Value::Object(map) => match map.get("message") {
            Some(Value::String(s)) => vec![s.clone()],
            _ => map
                .iter()
                .flat_map(|(field, value)| {
                    collect_error_messages(value)
                        .into_iter()
                        .map(move |m| format!("{field}: {m}"))
                })
                .collect(),
        },
        _ => Vec::new(),
    }
}

fn preview(body: &str) -> String {
    body.chars().take(MAX_BODY_PREVIEW).collect()
}
