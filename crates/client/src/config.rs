//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CART_API_BASE_URL` - Root URL of the cart API (http or https)
//!
//! ## Optional
//! - `CART_STORAGE_PATH` - Guest cart storage document (default: .cartsync/storage.json)
//! - `CART_STORAGE_KEY` - Storage key for the guest cart (default: `guest_cart`)
//! - `CART_BEARER_TOKEN` - Credential from a completed sign-in
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use cartsync_core::BearerToken;

use crate::local::GUEST_CART_KEY;

const DEFAULT_STORAGE_PATH: &str = ".cartsync/storage.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart client configuration.
///
/// `Debug` output never includes the bearer token.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root URL of the cart API
    pub api_base_url: Url,
    /// Path of the guest cart storage document
    pub storage_path: PathBuf,
    /// Storage key holding the guest cart
    pub storage_key: String,
    /// Credential from a completed sign-in, if any
    pub bearer_token: Option<BearerToken>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url =
            parse_base_url("CART_API_BASE_URL", &get_required_env("CART_API_BASE_URL")?)?;
        let storage_path =
            PathBuf::from(get_env_or_default("CART_STORAGE_PATH", DEFAULT_STORAGE_PATH));
        let storage_key = get_env_or_default("CART_STORAGE_KEY", GUEST_CART_KEY);
        if storage_key.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "CART_STORAGE_KEY".to_string(),
                "must not be empty".to_string(),
            ));
        }
        let bearer_token = get_optional_env("CART_BEARER_TOKEN").and_then(BearerToken::new);
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            api_base_url,
            storage_path,
            storage_key,
            bearer_token,
            sentry_dsn,
        })
    }

    /// Configuration with defaults for everything but the API root.
    #[must_use]
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            storage_key: GUEST_CART_KEY.to_string(),
            bearer_token: None,
            sentry_dsn: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse and validate the API root URL.
fn parse_base_url(var_name: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must have a host".to_string(),
        ));
    }

    Ok(url)
}
