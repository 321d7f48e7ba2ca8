//! Core types for cartsync.
//!
//! This module provides type-safe wrappers for cart domain concepts.

pub mod cart;
pub mod price;
pub mod session;
pub mod sku;
pub mod token;

pub use cart::{CartLine, CartTotals, PLACEHOLDER_PRODUCT_NAME};
pub use price::{CurrencyCode, format_price};
pub use session::SessionMode;
pub use sku::{Sku, SkuError};
pub use token::BearerToken;
