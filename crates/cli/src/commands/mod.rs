//! Cart commands.
//!
//! Every command opens the same view model: guest cart in the file named by
//! `CART_STORAGE_PATH`, remote cart at `CART_API_BASE_URL`, credential from
//! `CART_BEARER_TOKEN`.

use std::sync::Arc;

use thiserror::Error;

use cartsync_client::config::ConfigError;
use cartsync_client::{
    CartContext, CartError, CartViewModel, ClientConfig, FileStorage, HttpCartGateway,
    LocalCartStore, Session,
};

pub mod cart;
pub mod sync;

pub use cart::{add, clear, line, remove, set_quantity, show};
pub use sync::sync;

/// The view model as wired for the CLI.
pub type CliView = CartViewModel<FileStorage, HttpCartGateway>;

/// Errors surfaced by a command.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("A credential is required to sync (--token or CART_BEARER_TOKEN)")]
    MissingToken,
}

/// Wire storage, gateway and session into a view model.
pub fn open(config: &ClientConfig) -> CliView {
    let storage = Arc::new(FileStorage::new(config.storage_path.clone()));
    let store = LocalCartStore::with_key(storage, config.storage_key.clone());
    let gateway = HttpCartGateway::from_config(config);

    CartViewModel::new(CartContext::new(Session::new(), store, gateway))
}

/// Settle the session from the configured credential.
async fn resolve(view: &CliView, config: &ClientConfig) -> Result<(), CliError> {
    let mode = view.resolve_session(config.bearer_token.clone()).await?;
    tracing::debug!(mode = %mode, "Session resolved");
    Ok(())
}

/// Print the view as pretty JSON.
fn print(view: &CliView) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(&view.snapshot())?);
    Ok(())
}
