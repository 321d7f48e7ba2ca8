//! Cart view model.
//!
//! Per-page cart state used by the catalog, product detail, cart and
//! checkout surfaces. Routes reads and writes by session mode:
//!
//! - `Guest` - the guest cart store
//! - `Authenticated` - the remote cart gateway
//! - `Unknown` - nothing; mutations are rejected with
//!   [`CartError::SessionPending`] and the page shows a verifying state
//!
//! Whatever the source, the UI sees the same [`CartLine`] list.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use cartsync_core::{BearerToken, CartLine, CartTotals, SessionMode, Sku, format_price};

use crate::error::{CartError, Result, add_breadcrumb};
use crate::gateway::CartGateway;
use crate::reconcile::ReconcileOutcome;
use crate::state::CartContext;
use crate::storage::KeyValueStorage;

/// How responses are applied to the in-memory line list.
///
/// Remote mutations are not sequenced against each other. Every response
/// replaces the whole list, so a slow earlier response can overwrite a newer
/// one (last write wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponsePolicy {
    #[default]
    OverwriteOnResponse,
}

/// Everything a cart surface needs to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub mode: SessionMode,
    pub lines: Vec<CartLine>,
    pub totals: CartTotals,
    /// Subtotal as shown on the cart page (e.g., "$12.50").
    pub formatted_subtotal: String,
    /// Session still being verified; show a neutral state.
    pub verifying: bool,
}

#[derive(Debug)]
struct ViewState {
    lines: Vec<CartLine>,
    mounted: bool,
}

/// Cart state for one page.
pub struct CartViewModel<S, G> {
    context: CartContext<S, G>,
    policy: ResponsePolicy,
    view: Mutex<ViewState>,
}

impl<S: KeyValueStorage, G: CartGateway> CartViewModel<S, G> {
    /// Create a mounted view with no lines loaded.
    #[must_use]
    pub fn new(context: CartContext<S, G>) -> Self {
        Self {
            context,
            policy: ResponsePolicy::default(),
            view: Mutex::new(ViewState {
                lines: Vec::new(),
                mounted: true,
            }),
        }
    }

    /// The shared cart context.
    #[must_use]
    pub const fn context(&self) -> &CartContext<S, G> {
        &self.context
    }

    /// Current session mode.
    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.context.session().mode()
    }

    /// Policy used to apply responses.
    #[must_use]
    pub const fn policy(&self) -> ResponsePolicy {
        self.policy
    }

    /// Lines currently shown.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.lock().lines.clone()
    }

    /// Item count and subtotal of the lines currently shown.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        CartTotals::from_lines(&self.lock().lines)
    }

    /// Render state for the page.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        let mode = self.mode();
        let lines = self.lines();
        let totals = CartTotals::from_lines(&lines);
        CartSnapshot {
            mode,
            formatted_subtotal: format_price(totals.subtotal),
            totals,
            lines,
            verifying: !mode.is_settled(),
        }
    }

    /// Detach the view. Responses arriving later are not applied.
    pub fn unmount(&self) {
        self.lock().mounted = false;
    }

    /// Whether responses are still applied to this view.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.lock().mounted
    }

    // =========================================================================
    // Session transitions
    // =========================================================================

    /// Settle an `Unknown` session at page load.
    ///
    /// A previously issued credential is checked against the cart API. A 401
    /// settles as guest; a success settles as authenticated. Any other
    /// failure still settles as authenticated (the credential was not
    /// rejected) and is returned. Never triggers reconciliation.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the check failed for a reason other
    /// than a rejected credential.
    #[instrument(skip_all)]
    pub async fn resolve_session(&self, token: Option<BearerToken>) -> Result<SessionMode> {
        let mode = self.mode();
        if mode.is_settled() {
            return Ok(mode);
        }

        let Some(token) = token else {
            self.context.session().revert_to_guest();
            self.apply(self.context.store().read());
            return Ok(SessionMode::Guest);
        };

        match self.context.gateway().get_cart(&token).await {
            Ok(lines) => {
                self.context.session().authenticate(token);
                self.apply(lines);
                Ok(SessionMode::Authenticated)
            }
            Err(CartError::Unauthorized) => {
                info!("Stored credential rejected, continuing as guest");
                self.context.session().revert_to_guest();
                self.apply(self.context.store().read());
                Ok(SessionMode::Guest)
            }
            Err(e) => {
                warn!(error = %e, "Could not verify stored credential");
                self.context.session().authenticate(token);
                Err(e)
            }
        }
    }

    /// Handle the "credential just became valid" event, then show the
    /// server cart.
    pub async fn credential_obtained(&self, token: BearerToken) -> ReconcileOutcome {
        let outcome = self.context.credential_obtained(token).await;
        if let Err(e) = self.load().await {
            warn!(error = %e, "Failed to load cart after sign-in");
        }
        outcome
    }

    /// Retry syncing guest lines that failed at sign-in.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Unauthorized`] when there is no credential.
    pub async fn retry_reconciliation(&self) -> Result<ReconcileOutcome> {
        let Some(outcome) = self.context.retry_reconciliation().await else {
            return Err(CartError::Unauthorized);
        };
        if let Err(e) = self.load().await {
            warn!(error = %e, "Failed to load cart after retry");
        }
        Ok(outcome)
    }

    /// Explicit sign-out. The remote view is dropped and the guest cart
    /// starts empty.
    pub fn sign_out(&self) {
        self.context.sign_out();
        self.apply(Vec::new());
    }

    // =========================================================================
    // Reads and mutations
    // =========================================================================

    /// Load lines from the source for the current mode.
    ///
    /// # Errors
    ///
    /// Returns gateway errors while authenticated.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Vec<CartLine>> {
        match self.mode() {
            SessionMode::Unknown => Ok(self.lines()),
            SessionMode::Guest => Ok(self.apply(self.context.store().read())),
            SessionMode::Authenticated => {
                let token = self.token_or_revert()?;
                let result = self.context.gateway().get_cart(&token).await;
                self.settle(result)
            }
        }
    }

    /// Add a line, merging with any existing line for the SKU.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for a zero quantity,
    /// [`CartError::SessionPending`] while verifying, or gateway errors.
    #[instrument(skip(self, line), fields(sku = %line.sku, quantity = line.quantity))]
    pub async fn add_line(&self, line: CartLine) -> Result<Vec<CartLine>> {
        if line.quantity == 0 {
            return Err(CartError::InvalidQuantity(0));
        }
        add_breadcrumb("cart", "Added line", Some(&[("sku", line.sku.as_str())]));

        match self.mode() {
            SessionMode::Unknown => Err(CartError::SessionPending),
            SessionMode::Guest => Ok(self.apply(self.context.store().add_line(line))),
            SessionMode::Authenticated => {
                let token = self.token_or_revert()?;
                let result = self
                    .context
                    .gateway()
                    .add_line(&token, &line.sku, line.quantity)
                    .await;
                self.settle(result)
            }
        }
    }

    /// Replace the quantity for `sku`. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::SessionPending`] while verifying, or gateway
    /// errors.
    #[instrument(skip(self, sku), fields(sku = %sku))]
    pub async fn set_quantity(&self, sku: &Sku, quantity: u32) -> Result<Vec<CartLine>> {
        add_breadcrumb("cart", "Changed quantity", Some(&[("sku", sku.as_str())]));

        match self.mode() {
            SessionMode::Unknown => Err(CartError::SessionPending),
            SessionMode::Guest => {
                Ok(self.apply(self.context.store().set_quantity(sku, quantity)))
            }
            SessionMode::Authenticated => {
                let token = self.token_or_revert()?;
                let result = self
                    .context
                    .gateway()
                    .update_quantity(&token, sku, quantity)
                    .await;
                self.settle(result)
            }
        }
    }

    /// Remove the line for `sku`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::SessionPending`] while verifying, or gateway
    /// errors.
    #[instrument(skip(self, sku), fields(sku = %sku))]
    pub async fn remove_line(&self, sku: &Sku) -> Result<Vec<CartLine>> {
        add_breadcrumb("cart", "Removed line", Some(&[("sku", sku.as_str())]));

        match self.mode() {
            SessionMode::Unknown => Err(CartError::SessionPending),
            SessionMode::Guest => Ok(self.apply(self.context.store().remove_line(sku))),
            SessionMode::Authenticated => {
                let token = self.token_or_revert()?;
                let result = self.context.gateway().remove_line(&token, sku).await;
                self.settle(result)
            }
        }
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::SessionPending`] while verifying, or gateway
    /// errors.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<Vec<CartLine>> {
        add_breadcrumb("cart", "Cleared cart", None);

        match self.mode() {
            SessionMode::Unknown => Err(CartError::SessionPending),
            SessionMode::Guest => {
                self.context.store().clear();
                Ok(self.apply(Vec::new()))
            }
            SessionMode::Authenticated => {
                let token = self.token_or_revert()?;
                let result = self.context.gateway().clear(&token).await;
                self.settle(result)
            }
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn token_or_revert(&self) -> Result<BearerToken> {
        let Some(token) = self.context.session().token() else {
            self.revert_view();
            return Err(CartError::Unauthorized);
        };
        Ok(token)
    }

    /// Drop the remote view and show the guest cart.
    fn revert_view(&self) {
        self.context.revert_to_guest();
        self.apply(self.context.store().read());
    }

    /// Apply a gateway result. A 401 reverts the whole app to guest mode.
    fn settle(&self, result: Result<Vec<CartLine>>) -> Result<Vec<CartLine>> {
        match result {
            Ok(lines) => Ok(self.apply(lines)),
            Err(CartError::Unauthorized) => {
                self.revert_view();
                Err(CartError::Unauthorized)
            }
            Err(e) => Err(e),
        }
    }

    fn apply(&self, lines: Vec<CartLine>) -> Vec<CartLine> {
        let mut view = self.lock();
        if !view.mounted {
            debug!("View unmounted, discarding response");
            return lines;
        }

        match self.policy {
            ResponsePolicy::OverwriteOnResponse => view.lines.clone_from(&lines),
        }
        lines
    }
}
