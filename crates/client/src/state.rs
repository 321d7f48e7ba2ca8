//! Application-wide cart context.

use std::sync::Arc;

use tracing::{info, instrument};

use cartsync_core::{BearerToken, SessionMode};

use crate::error::add_breadcrumb;
use crate::gateway::CartGateway;
use crate::local::LocalCartStore;
use crate::reconcile::{ReconcileOutcome, ReconciliationCoordinator};
use crate::session::Session;
use crate::storage::KeyValueStorage;

/// Cart context shared by every cart surface.
///
/// Constructed once per application instance and cheaply cloneable via
/// `Arc`. Owns the session, the guest cart store, the gateway and the
/// reconciliation coordinator, so nothing cart-related lives in globals.
pub struct CartContext<S, G> {
    inner: Arc<CartContextInner<S, G>>,
}

struct CartContextInner<S, G> {
    session: Session,
    store: LocalCartStore<S>,
    gateway: G,
    coordinator: ReconciliationCoordinator,
}

impl<S, G> Clone for CartContext<S, G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: KeyValueStorage, G: CartGateway> CartContext<S, G> {
    /// Create the context.
    #[must_use]
    pub fn new(session: Session, store: LocalCartStore<S>, gateway: G) -> Self {
        Self {
            inner: Arc::new(CartContextInner {
                session,
                store,
                gateway,
                coordinator: ReconciliationCoordinator::new(),
            }),
        }
    }

    /// Get a reference to the session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Get a reference to the guest cart store.
    #[must_use]
    pub fn store(&self) -> &LocalCartStore<S> {
        &self.inner.store
    }

    /// Get a reference to the remote cart gateway.
    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.inner.gateway
    }

    /// Get a reference to the reconciliation coordinator.
    #[must_use]
    pub fn coordinator(&self) -> &ReconciliationCoordinator {
        &self.inner.coordinator
    }

    /// Handle the "credential just became valid" event.
    ///
    /// Switches the session to authenticated and merges the guest cart into
    /// the server cart. Duplicate events collapse into one run.
    #[instrument(skip_all)]
    pub async fn credential_obtained(&self, token: BearerToken) -> ReconcileOutcome {
        let previous = self.session().authenticate(token.clone());
        info!(previous = %previous, "Credential obtained");
        add_breadcrumb("auth", "Credential obtained", None);

        self.coordinator()
            .reconcile(self.store(), self.gateway(), &token)
            .await
    }

    /// Retry a partially failed reconciliation.
    ///
    /// Returns `None` when there is no credential to retry with.
    pub async fn retry_reconciliation(&self) -> Option<ReconcileOutcome> {
        let token = self.session().token()?;
        Some(
            self.coordinator()
                .reconcile(self.store(), self.gateway(), &token)
                .await,
        )
    }

    /// Drop the credential after the server rejected it.
    ///
    /// The guest cart is kept: anything in it belongs to this shopper and
    /// failed to sync.
    pub fn revert_to_guest(&self) -> SessionMode {
        let previous = self.session().revert_to_guest();
        self.coordinator().reset();
        info!(previous = %previous, "Reverted to guest session");
        previous
    }

    /// Explicit sign-out.
    ///
    /// The guest cart starts empty afterwards so a shared device never shows
    /// the previous shopper's items.
    pub fn sign_out(&self) {
        self.revert_to_guest();
        self.store().clear();
        add_breadcrumb("auth", "Signed out", None);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cartsync_core::CartLine;

    use super::*;
    use crate::reconcile::ReconcileState;
    use crate::storage::MemoryStorage;
    use crate::testing::{FakeGateway, sku, token};

    fn context() -> CartContext<MemoryStorage, FakeGateway> {
        CartContext::new(
            Session::guest(),
            LocalCartStore::new(Arc::new(MemoryStorage::new())),
            FakeGateway::new(),
        )
    }

    #[tokio::test]
    async fn test_credential_obtained_reconciles_once() {
        let ctx = context();
        ctx.store().add_line(CartLine::new(sku("A"), 2));

        let first = ctx.credential_obtained(token()).await;
        let second = ctx.credential_obtained(token()).await;

        assert_eq!(first, ReconcileOutcome::Merged { merged: 1 });
        assert_eq!(second, ReconcileOutcome::Skipped);
        assert_eq!(ctx.session().mode(), SessionMode::Authenticated);
        assert_eq!(ctx.gateway().add_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_requires_credential() {
        let ctx = context();
        assert!(ctx.retry_reconciliation().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_out_resets_and_clears_guest_cart() {
        let ctx = context();
        ctx.store().add_line(CartLine::new(sku("A"), 1));
        ctx.gateway().fail_sku("A");
        ctx.credential_obtained(token()).await;
        assert_eq!(ctx.store().read().len(), 1);

        ctx.sign_out();

        assert_eq!(ctx.session().mode(), SessionMode::Guest);
        assert!(ctx.store().is_empty());
        assert_eq!(ctx.coordinator().state(), ReconcileState::Idle);
    }

    #[tokio::test]
    async fn test_revert_to_guest_keeps_guest_cart() {
        let ctx = context();
        ctx.store().add_line(CartLine::new(sku("A"), 1));
        ctx.gateway().fail_sku("A");
        ctx.credential_obtained(token()).await;

        assert_eq!(ctx.revert_to_guest(), SessionMode::Authenticated);
        assert_eq!(ctx.store().read().len(), 1);
        assert!(ctx.session().token().is_none());
    }
}
