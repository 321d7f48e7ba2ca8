//! In-memory fakes shared by unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use cartsync_core::{BearerToken, CartLine, Sku};

use crate::error::{CartError, Result};
use crate::gateway::CartGateway;
use crate::normalize::merge_by_sku;

/// A recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get,
    Add(String, u32),
    Update(String, u32),
    Remove(String),
    Clear,
}

/// Gateway fake holding a server cart in memory.
///
/// Adds merge by SKU through quantity summation, as the real server does.
#[derive(Default)]
pub struct FakeGateway {
    pub calls: Mutex<Vec<Call>>,
    pub server_lines: Mutex<Vec<CartLine>>,
    failing: Mutex<HashSet<String>>,
    unauthorized: Mutex<bool>,
    hold: Mutex<Option<Arc<Notify>>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject add-line calls for `sku` with a 503.
    pub fn fail_sku(&self, sku: &str) {
        self.failing.lock().unwrap().insert(sku.to_string());
    }

    pub fn heal_sku(&self, sku: &str) {
        self.failing.lock().unwrap().remove(sku);
    }

    /// Answer every call with 401.
    pub fn reject_credentials(&self, reject: bool) {
        *self.unauthorized.lock().unwrap() = reject;
    }

    /// Park the next call until the returned handle is notified.
    pub fn hold_next(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn add_calls(&self) -> Vec<(String, u32)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Add(sku, quantity) => Some((sku, quantity)),
                _ => None,
            })
            .collect()
    }

    pub fn seed(&self, lines: Vec<CartLine>) {
        *self.server_lines.lock().unwrap() = lines;
    }

    async fn enter(&self, call: Call) -> Result<()> {
        let hold = self.hold.lock().unwrap().take();
        if let Some(notify) = hold {
            notify.notified().await;
        }
        self.calls.lock().unwrap().push(call);
        if *self.unauthorized.lock().unwrap() {
            return Err(CartError::Unauthorized);
        }
        Ok(())
    }

    fn snapshot(&self) -> Vec<CartLine> {
        self.server_lines.lock().unwrap().clone()
    }
}

#[async_trait]
impl CartGateway for FakeGateway {
    async fn get_cart(&self, _token: &BearerToken) -> Result<Vec<CartLine>> {
        self.enter(Call::Get).await?;
        Ok(self.snapshot())
    }

    async fn add_line(
        &self,
        _token: &BearerToken,
        sku: &Sku,
        quantity: u32,
    ) -> Result<Vec<CartLine>> {
        self.enter(Call::Add(sku.to_string(), quantity)).await?;
        if self.failing.lock().unwrap().contains(sku.as_str()) {
            return Err(CartError::api(503, "unavailable"));
        }
        {
            let mut lines = self.server_lines.lock().unwrap();
            let mut next = std::mem::take(&mut *lines);
            next.push(CartLine::new(sku.clone(), quantity));
            *lines = merge_by_sku(next);
        }
        Ok(self.snapshot())
    }

    async fn update_quantity(
        &self,
        _token: &BearerToken,
        sku: &Sku,
        quantity: u32,
    ) -> Result<Vec<CartLine>> {
        self.enter(Call::Update(sku.to_string(), quantity)).await?;
        {
            let mut lines = self.server_lines.lock().unwrap();
            for line in lines.iter_mut().filter(|l| &l.sku == sku) {
                line.quantity = quantity;
            }
            lines.retain(|l| l.quantity > 0);
        }
        Ok(self.snapshot())
    }

    async fn remove_line(&self, _token: &BearerToken, sku: &Sku) -> Result<Vec<CartLine>> {
        self.enter(Call::Remove(sku.to_string())).await?;
        self.server_lines.lock().unwrap().retain(|l| &l.sku != sku);
        Ok(self.snapshot())
    }

    async fn clear(&self, _token: &BearerToken) -> Result<Vec<CartLine>> {
        self.enter(Call::Clear).await?;
        self.server_lines.lock().unwrap().clear();
        Ok(self.snapshot())
    }
}

pub fn sku(s: &str) -> Sku {
    Sku::parse(s).unwrap()
}

pub fn token() -> BearerToken {
    BearerToken::new("test-token").unwrap()
}
