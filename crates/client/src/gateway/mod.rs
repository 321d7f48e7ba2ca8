//! Remote cart gateway.
//!
//! The only component that talks to the server's cart endpoints. Every
//! operation needs a bearer credential and returns the full normalized cart
//! snapshot the server answered with; the caller replaces its copy wholesale.
//!
//! # Example
//!
//! ```rust,ignore
//! use cartsync_client::{CartGateway, HttpCartGateway};
//!
//! let gateway = HttpCartGateway::from_config(&config);
//! let lines = gateway.add_line(&token, &sku, 2).await?;
//! ```

mod http;

pub use http::HttpCartGateway;

use async_trait::async_trait;

use cartsync_core::{BearerToken, CartLine, Sku};

use crate::error::Result;

/// Authenticated operations on the server-side cart.
///
/// A rejected or expired credential surfaces as
/// [`CartError::Unauthorized`](crate::CartError::Unauthorized); it is never
/// retried here.
#[async_trait]
pub trait CartGateway: Send + Sync {
    /// Fetch the full cart.
    async fn get_cart(&self, token: &BearerToken) -> Result<Vec<CartLine>>;

    /// Add `quantity` of `sku`. The server merges with an existing line.
    async fn add_line(
        &self,
        token: &BearerToken,
        sku: &Sku,
        quantity: u32,
    ) -> Result<Vec<CartLine>>;

    /// Replace the quantity of the line for `sku`.
    async fn update_quantity(
        &self,
        token: &BearerToken,
        sku: &Sku,
        quantity: u32,
    ) -> Result<Vec<CartLine>>;

    /// Remove the line for `sku`.
    async fn remove_line(&self, token: &BearerToken, sku: &Sku) -> Result<Vec<CartLine>>;

    /// Remove every line.
    async fn clear(&self, token: &BearerToken) -> Result<Vec<CartLine>>;
}
