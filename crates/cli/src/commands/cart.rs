//! Read and mutate the cart for the resolved session.

use rust_decimal::Decimal;

use cartsync_client::ClientConfig;
use cartsync_core::{CartLine, Sku};

use super::{CliError, CliView, print, resolve};

/// Build a line from command arguments.
pub fn line(
    sku: Sku,
    quantity: u32,
    name: Option<String>,
    variant: Option<String>,
    price: Option<Decimal>,
) -> CartLine {
    CartLine::new(sku, quantity)
        .with_product(name.unwrap_or_default(), variant)
        .with_price(price.unwrap_or_default())
}

/// Print the cart.
///
/// # Errors
///
/// Returns an error if the cart could not be loaded.
pub async fn show(view: &CliView, config: &ClientConfig) -> Result<(), CliError> {
    resolve(view, config).await?;
    view.load().await?;
    print(view)
}

/// Add a line.
///
/// # Errors
///
/// Returns an error for a zero quantity or a failed remote call.
pub async fn add(view: &CliView, config: &ClientConfig, line: CartLine) -> Result<(), CliError> {
    resolve(view, config).await?;
    view.add_line(line).await?;
    print(view)
}

/// Replace the quantity of a line.
///
/// # Errors
///
/// Returns an error if the remote call failed.
pub async fn set_quantity(
    view: &CliView,
    config: &ClientConfig,
    sku: &Sku,
    quantity: u32,
) -> Result<(), CliError> {
    resolve(view, config).await?;
    view.set_quantity(sku, quantity).await?;
    print(view)
}

/// Remove a line.
///
/// # Errors
///
/// Returns an error if the remote call failed.
pub async fn remove(view: &CliView, config: &ClientConfig, sku: &Sku) -> Result<(), CliError> {
    resolve(view, config).await?;
    view.remove_line(sku).await?;
    print(view)
}

/// Remove every line.
///
/// # Errors
///
/// Returns an error if the remote call failed.
pub async fn clear(view: &CliView, config: &ClientConfig) -> Result<(), CliError> {
    resolve(view, config).await?;
    view.clear().await?;
    print(view)
}
