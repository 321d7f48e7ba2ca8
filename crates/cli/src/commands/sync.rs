//! Sign-in sync.
//!
//! Treats the configured credential as freshly obtained and merges the guest
//! cart file into the server cart. Lines that fail stay in the file, so
//! running `cart sync` again retries only those.

use tracing::{info, warn};

use cartsync_client::ClientConfig;
use cartsync_core::BearerToken;

use super::{CliError, CliView, print};

/// Run the guest-to-server merge.
///
/// # Errors
///
/// Returns [`CliError::MissingToken`] without a credential. Line failures
/// are reported as a warning, not an error.
pub async fn sync(
    view: &CliView,
    config: &ClientConfig,
    token: Option<String>,
) -> Result<(), CliError> {
    let token = token
        .and_then(BearerToken::new)
        .or_else(|| config.bearer_token.clone())
        .ok_or(CliError::MissingToken)?;

    let outcome = view.credential_obtained(token).await;
    match outcome.warning() {
        Some(message) => warn!(failed = outcome.failed_items().len(), "{message}"),
        None => info!(outcome = ?outcome, "Guest cart synced"),
    }

    print(view)
}
