//! Guest cart store.
//!
//! Owns the durable representation of the anonymous cart: one JSON array of
//! lines under a single storage key. Pure read/write/normalize, no network.
//! Storage failures are logged and recovered here; they never reach callers.

use std::sync::Arc;

use tracing::warn;

use cartsync_core::{CartLine, Sku};

use crate::normalize::{normalize_lines, normalize_str};
use crate::storage::KeyValueStorage;

/// Default storage key for the guest cart.
pub const GUEST_CART_KEY: &str = "guest_cart";

/// The guest cart, persisted in injected key-value storage.
///
/// Cheaply cloneable; clones share the same storage.
#[derive(Debug)]
pub struct LocalCartStore<S> {
    storage: Arc<S>,
    key: String,
}

impl<S> Clone for LocalCartStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            key: self.key.clone(),
        }
    }
}

impl<S: KeyValueStorage> LocalCartStore<S> {
    /// Create a store using the default key.
    #[must_use]
    pub fn new(storage: Arc<S>) -> Self {
        Self::with_key(storage, GUEST_CART_KEY)
    }

    /// Create a store using a custom key.
    #[must_use]
    pub fn with_key(storage: Arc<S>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Storage key holding the guest cart.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the guest cart. Missing or unreadable storage reads as empty.
    #[must_use]
    pub fn read(&self) -> Vec<CartLine> {
        match self.storage.get(&self.key) {
            Ok(Some(raw)) => normalize_str(&raw),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read guest cart, treating as empty");
                Vec::new()
            }
        }
    }

    /// Persist `lines` and return the normalized form that was written.
    ///
    /// Lines are re-normalized first, so zero-quantity lines are dropped and
    /// duplicate SKUs are merged. Writing an empty cart removes the key.
    pub fn write(&self, lines: Vec<CartLine>) -> Vec<CartLine> {
        let normalized = match serde_json::to_value(&lines) {
            Ok(value) => normalize_lines(&value),
            Err(e) => {
                warn!(error = %e, "Failed to serialize guest cart lines");
                return self.read();
            }
        };

        if normalized.is_empty() {
            self.clear();
            return self.read();
        }

        match serde_json::to_string(&normalized) {
            Ok(raw) => match self.storage.set(&self.key, &raw) {
                Ok(()) => normalized,
                Err(e) => {
                    warn!(key = %self.key, error = %e, "Failed to write guest cart");
                    self.read()
                }
            },
            Err(e) => {
                warn!(error = %e, "Failed to encode guest cart");
                self.read()
            }
        }
    }

    /// Remove the guest cart entirely.
    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(&self.key) {
            warn!(key = %self.key, error = %e, "Failed to clear guest cart");
        }
    }

    /// Whether the guest cart holds no valid lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Add a line, summing quantities with any existing line for the SKU.
    pub fn add_line(&self, line: CartLine) -> Vec<CartLine> {
        let mut lines = self.read();
        lines.push(line);
        self.write(lines)
    }

    /// Replace the quantity of the line for `sku`. Zero removes the line.
    pub fn set_quantity(&self, sku: &Sku, quantity: u32) -> Vec<CartLine> {
        let lines = self
            .read()
            .into_iter()
            .map(|mut line| {
                if &line.sku == sku {
                    line.quantity = quantity;
                }
                line
            })
            .collect();
        self.write(lines)
    }

    /// Remove the line for `sku`.
    pub fn remove_line(&self, sku: &Sku) -> Vec<CartLine> {
        let lines = self
            .read()
            .into_iter()
            .filter(|line| &line.sku != sku)
            .collect();
        self.write(lines)
    }
}
