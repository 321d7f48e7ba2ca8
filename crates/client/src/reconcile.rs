//! Guest cart reconciliation.
//!
//! When a shopper obtains a credential (sign-in, registration, email
//! verification, OAuth callback) the guest cart is drained into the server
//! cart exactly once:
//!
//! 1. Read the guest cart. Empty means nothing to merge.
//! 2. Issue one add-line request per line, sequentially. The server merges
//!    with any existing line for the same SKU.
//! 3. Collect failed lines without stopping.
//! 4. No failures: delete the guest cart.
//! 5. Failures: overwrite the guest cart with exactly the failed lines.
//!
//! Retrying only resubmits what failed last time. A crash between a
//! successful add and the local delete can resubmit a line later; the server
//! merges by SKU, so the worst case is an over-counted quantity.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use cartsync_core::{BearerToken, CartLine};

use crate::error::add_breadcrumb;
use crate::gateway::CartGateway;
use crate::local::LocalCartStore;
use crate::storage::KeyValueStorage;

/// Lifecycle of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileState {
    #[default]
    Idle,
    Running,
    Done,
}

/// Result of a reconciliation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The guest cart was empty; no requests were made.
    NothingToMerge,
    /// Every guest line was added to the server cart.
    Merged { merged: usize },
    /// Some lines failed and remain in the guest cart for a retry.
    PartiallyFailed {
        merged: usize,
        failed_items: Vec<CartLine>,
    },
    /// Another run is in flight or already completed.
    Skipped,
}

impl ReconcileOutcome {
    /// Whether the guest cart is fully merged (or had nothing to merge).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::NothingToMerge | Self::Merged { .. })
    }

    /// Lines kept locally for a retry.
    #[must_use]
    pub fn failed_items(&self) -> &[CartLine] {
        match self {
            Self::PartiallyFailed { failed_items, .. } => failed_items,
            _ => &[],
        }
    }

    /// Non-blocking warning for the shopper, if any lines failed.
    #[must_use]
    pub fn warning(&self) -> Option<String> {
        match self.failed_items().len() {
            0 => None,
            1 => Some("Could not sync 1 item from your guest cart".to_string()),
            n => Some(format!("Could not sync {n} items from your guest cart")),
        }
    }
}

/// Runs the guest-to-server merge at most once per sign-in.
///
/// Triggers while a run is in flight, or after a successful run, are no-ops.
/// A partially failed run returns to `Idle` so the shopper can retry.
#[derive(Debug, Default)]
pub struct ReconciliationCoordinator {
    state: Mutex<ReconcileState>,
}

impl ReconciliationCoordinator {
    /// Create an idle coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ReconcileState {
        *self.lock()
    }

    /// Allow the next sign-in to reconcile again.
    ///
    /// A run in flight is left alone.
    pub fn reset(&self) {
        let mut state = self.lock();
        if *state == ReconcileState::Done {
            *state = ReconcileState::Idle;
        }
    }

    /// Merge the guest cart into the server cart.
    pub async fn reconcile<S, G>(
        &self,
        store: &LocalCartStore<S>,
        gateway: &G,
        token: &BearerToken,
    ) -> ReconcileOutcome
    where
        S: KeyValueStorage,
        G: CartGateway + ?Sized,
    {
        let Some(run) = self.begin() else {
            debug!("Reconciliation already running or done, skipping");
            return ReconcileOutcome::Skipped;
        };

        // Quantities are captured here; later guest edits are not re-read
        let lines = store.read();
        if lines.is_empty() {
            run.finish(ReconcileState::Done);
            return ReconcileOutcome::NothingToMerge;
        }

        info!(lines = lines.len(), "Reconciling guest cart");

        let mut merged = 0;
        let mut failed = Vec::new();
        for line in lines {
            match gateway.add_line(token, &line.sku, line.quantity).await {
                Ok(_) => merged += 1,
                Err(e) => {
                    warn!(sku = %line.sku, quantity = line.quantity, error = %e, "Failed to sync guest cart line");
                    failed.push(line);
                }
            }
        }

        if failed.is_empty() {
            store.clear();
            run.finish(ReconcileState::Done);
            info!(merged, "Guest cart reconciled");
            add_breadcrumb("cart", "Guest cart reconciled", None);
            return ReconcileOutcome::Merged { merged };
        }

        let failed_items = store.write(failed);
        run.finish(ReconcileState::Idle);
        warn!(merged, failed = failed_items.len(), "Guest cart partially reconciled");
        let failed_count = failed_items.len().to_string();
        add_breadcrumb(
            "cart",
            "Guest cart partially reconciled",
            Some(&[("failed", failed_count.as_str())]),
        );

        ReconcileOutcome::PartiallyFailed {
            merged,
            failed_items,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReconcileState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Option<RunGuard<'_>> {
        let mut state = self.lock();
        if *state != ReconcileState::Idle {
            return None;
        }
        *state = ReconcileState::Running;
        Some(RunGuard {
            coordinator: self,
            finished: false,
        })
    }
}

/// Marks a run in flight; an abandoned run returns the coordinator to `Idle`.
struct RunGuard<'a> {
    coordinator: &'a ReconciliationCoordinator,
    finished: bool,
}

impl RunGuard<'_> {
    fn finish(mut self, next: ReconcileState) {
        *self.coordinator.lock() = next;
        self.finished = true;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *self.coordinator.lock() = ReconcileState::Idle;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::MemoryStorage;
    use crate::testing::{FakeGateway, sku, token};

    fn store_with(lines: &[(&str, u32)]) -> LocalCartStore<MemoryStorage> {
        let store = LocalCartStore::new(Arc::new(MemoryStorage::new()));
        for (s, quantity) in lines {
            store.add_line(CartLine::new(sku(s), *quantity));
        }
        store
    }

    #[tokio::test]
    async fn test_empty_guest_cart_short_circuits() {
        let store = store_with(&[]);
        let gateway = FakeGateway::new();
        let coordinator = ReconciliationCoordinator::new();

        let outcome = coordinator.reconcile(&store, &gateway, &token()).await;

        assert_eq!(outcome, ReconcileOutcome::NothingToMerge);
        assert!(outcome.is_success());
        assert!(gateway.calls().is_empty());
        assert_eq!(coordinator.state(), ReconcileState::Done);
    }

    #[tokio::test]
    async fn test_success_clears_guest_cart() {
        let store = store_with(&[("A", 2), ("B", 1), ("C", 4)]);
        let gateway = FakeGateway::new();
        let coordinator = ReconciliationCoordinator::new();

        let outcome = coordinator.reconcile(&store, &gateway, &token()).await;

        assert_eq!(outcome, ReconcileOutcome::Merged { merged: 3 });
        assert!(store.is_empty());
        assert_eq!(
            gateway.add_calls(),
            vec![
                ("A".to_string(), 2),
                ("B".to_string(), 1),
                ("C".to_string(), 4)
            ]
        );
        assert_eq!(coordinator.state(), ReconcileState::Done);
    }

    #[tokio::test]
    async fn test_server_merges_existing_lines() {
        let store = store_with(&[("A", 2)]);
        let gateway = FakeGateway::new();
        gateway.seed(vec![CartLine::new(sku("A"), 3)]);

        ReconciliationCoordinator::new()
            .reconcile(&store, &gateway, &token())
            .await;

        let server = gateway.server_lines.lock().unwrap().clone();
        assert_eq!(server.len(), 1);
        assert_eq!(server[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_partial_failure_retains_only_failures() {
        let store = store_with(&[("A", 2), ("B", 1), ("C", 3)]);
        let gateway = FakeGateway::new();
        gateway.fail_sku("B");
        gateway.fail_sku("C");
        let coordinator = ReconciliationCoordinator::new();

        let outcome = coordinator.reconcile(&store, &gateway, &token()).await;

        let ReconcileOutcome::PartiallyFailed {
            merged,
            failed_items,
        } = &outcome
        else {
            panic!("expected partial failure, got {outcome:?}");
        };
        assert_eq!(*merged, 1);
        assert_eq!(failed_items.len(), 2);

        let remaining: Vec<_> = store
            .read()
            .into_iter()
            .map(|l| (l.sku.to_string(), l.quantity))
            .collect();
        assert_eq!(remaining, vec![("B".to_string(), 1), ("C".to_string(), 3)]);
        assert_eq!(
            outcome.warning().as_deref(),
            Some("Could not sync 2 items from your guest cart")
        );
        assert_eq!(coordinator.state(), ReconcileState::Idle);
    }

    #[tokio::test]
    async fn test_example_scenario_order_and_result() {
        let store = store_with(&[("A", 2), ("B", 1)]);
        let gateway = FakeGateway::new();
        gateway.fail_sku("B");

        let outcome = ReconciliationCoordinator::new()
            .reconcile(&store, &gateway, &token())
            .await;

        assert_eq!(
            gateway.add_calls(),
            vec![("A".to_string(), 2), ("B".to_string(), 1)]
        );
        assert!(!outcome.is_success());
        assert_eq!(outcome.failed_items().len(), 1);
        assert_eq!(outcome.failed_items()[0].sku, sku("B"));
        assert_eq!(store.read().len(), 1);
        assert_eq!(store.read()[0].sku, sku("B"));
        assert_eq!(store.read()[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_retry_resubmits_only_failures() {
        let store = store_with(&[("A", 2), ("B", 1)]);
        let gateway = FakeGateway::new();
        gateway.fail_sku("B");
        let coordinator = ReconciliationCoordinator::new();

        coordinator.reconcile(&store, &gateway, &token()).await;
        gateway.heal_sku("B");
        let outcome = coordinator.reconcile(&store, &gateway, &token()).await;

        assert_eq!(outcome, ReconcileOutcome::Merged { merged: 1 });
        assert_eq!(
            gateway.add_calls(),
            vec![
                ("A".to_string(), 2),
                ("B".to_string(), 1),
                ("B".to_string(), 1)
            ]
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_lines_count_as_failures() {
        let store = store_with(&[("A", 1)]);
        let gateway = FakeGateway::new();
        gateway.reject_credentials(true);

        let outcome = ReconciliationCoordinator::new()
            .reconcile(&store, &gateway, &token())
            .await;

        assert_eq!(outcome.failed_items().len(), 1);
        assert_eq!(store.read().len(), 1);
    }

    #[tokio::test]
    async fn test_done_coordinator_skips_until_reset() {
        let store = store_with(&[("A", 1)]);
        let gateway = FakeGateway::new();
        let coordinator = ReconciliationCoordinator::new();

        coordinator.reconcile(&store, &gateway, &token()).await;
        store.add_line(CartLine::new(sku("B"), 1));

        let outcome = coordinator.reconcile(&store, &gateway, &token()).await;
        assert_eq!(outcome, ReconcileOutcome::Skipped);
        assert_eq!(gateway.add_calls().len(), 1);

        coordinator.reset();
        let outcome = coordinator.reconcile(&store, &gateway, &token()).await;
        assert_eq!(outcome, ReconcileOutcome::Merged { merged: 1 });
    }

    #[tokio::test]
    async fn test_concurrent_triggers_collapse() {
        let store = store_with(&[("A", 1), ("B", 1)]);
        let gateway = FakeGateway::new();
        let release = gateway.hold_next();
        let coordinator = ReconciliationCoordinator::new();
        let token = token();

        let (first, second) = tokio::join!(
            coordinator.reconcile(&store, &gateway, &token),
            async {
                let outcome = coordinator.reconcile(&store, &gateway, &token).await;
                release.notify_one();
                outcome
            }
        );

        assert_eq!(first, ReconcileOutcome::Merged { merged: 2 });
        assert_eq!(second, ReconcileOutcome::Skipped);
        assert_eq!(gateway.add_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_abandoned_run_returns_to_idle() {
        let store = store_with(&[("A", 1)]);
        let gateway = FakeGateway::new();
        let _release = gateway.hold_next();
        let coordinator = ReconciliationCoordinator::new();
        let token = token();

        {
            let run = coordinator.reconcile(&store, &gateway, &token);
            tokio::pin!(run);
            let polled = futures_poll_once(run.as_mut()).await;
            assert!(polled.is_none());
            assert_eq!(coordinator.state(), ReconcileState::Running);
        }

        assert_eq!(coordinator.state(), ReconcileState::Idle);
        assert_eq!(store.read().len(), 1);
    }

    /// Poll a future once, returning its output if it completed.
    async fn futures_poll_once<F: std::future::Future + Unpin>(fut: F) -> Option<F::Output> {
        let mut fut = fut;
        std::future::poll_fn(|cx| {
            std::task::Poll::Ready(match std::pin::Pin::new(&mut fut).poll(cx) {
                std::task::Poll::Ready(out) => Some(out),
                std::task::Poll::Pending => None,
            })
        })
        .await
    }
}
