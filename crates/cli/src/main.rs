//! Cartsync CLI - a command-line cart surface.
//!
//! Drives the same cart view model a storefront page would. Without a
//! credential every command works against the guest cart file; with one,
//! commands go to the remote cart API.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart for the current session
//! cart show
//!
//! # Add two of a SKU to the cart
//! cart add SKU-1 -q 2 --name "Tee" --variant "Large" --price 19.99
//!
//! # Change a quantity (0 removes the line)
//! cart set SKU-1 3
//!
//! # Merge the guest cart into the server cart
//! cart sync --token "$TOKEN"
//! ```
//!
//! # Commands
//!
//! - `show` - Print the cart as JSON
//! - `add` / `set` / `remove` / `clear` - Mutate the cart
//! - `sync` - Run the one-time guest-to-server merge

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cartsync_client::ClientConfig;
use cartsync_core::Sku;

mod commands;

#[derive(Parser)]
#[command(name = "cart")]
#[command(author, version, about = "Cartsync cart client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cart for the current session
    Show,
    /// Add a line, merging with an existing line for the same SKU
    Add {
        /// Stock keeping unit
        #[arg(value_parser = Sku::parse)]
        sku: Sku,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Product display name
        #[arg(short, long)]
        name: Option<String>,

        /// Variant display name
        #[arg(short, long)]
        variant: Option<String>,

        /// Unit price
        #[arg(short, long)]
        price: Option<Decimal>,
    },
    /// Replace the quantity of a line (0 removes it)
    Set {
        #[arg(value_parser = Sku::parse)]
        sku: Sku,
        quantity: u32,
    },
    /// Remove a line
    Remove {
        #[arg(value_parser = Sku::parse)]
        sku: Sku,
    },
    /// Remove every line
    Clear,
    /// Merge the guest cart into the server cart
    Sync {
        /// Credential to sign in with (defaults to `CART_BEARER_TOKEN`)
        #[arg(long)]
        token: Option<String>,
    },
}

/// Initialize Sentry and return the guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = ClientConfig::from_env();

    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Logs on stderr so stdout stays machine-readable
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cartsync_client=info,cartsync_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), commands::CliError> {
    let view = commands::open(&config);

    match cli.command {
        Commands::Show => commands::show(&view, &config).await,
        Commands::Add {
            sku,
            quantity,
            name,
            variant,
            price,
        } => {
            let line = commands::line(sku, quantity, name, variant, price);
            commands::add(&view, &config, line).await
        }
        Commands::Set { sku, quantity } => {
            commands::set_quantity(&view, &config, &sku, quantity).await
        }
        Commands::Remove { sku } => commands::remove(&view, &config, &sku).await,
        Commands::Clear => commands::clear(&view, &config).await,
        Commands::Sync { token } => commands::sync(&view, &config, token).await,
    }
}
