//! Typed cart errors with Sentry breadcrumbs.
//!
//! Storage and normalization problems are recovered inside their components
//! and never appear here. Everything a cart mutation can surface to its caller
//! is a `CartError`, so a mutation either yields a fresh authoritative line
//! list or one of these variants.

use thiserror::Error;

/// Errors surfaced by cart reads and mutations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The request could not complete (connection, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The bearer credential is missing, invalid or expired.
    #[error("Unauthorized: cart credential missing or rejected")]
    Unauthorized,

    /// The cart API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited by the cart API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The response body was not a valid envelope.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Quantity must be strictly positive.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// The session mode has not been resolved yet.
    #[error("Session is still being verified")]
    SessionPending,
}

/// Tone the UI should use when presenting an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl CartError {
    /// Create an API error from status and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether this error denotes a lost credential rather than a failure.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// HTTP status if the server answered.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Unauthorized => Some(401),
            Self::RateLimited(_) => Some(429),
            _ => None,
        }
    }

    /// Presentation tone for this error.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            // State transitions, not failures
            Self::Unauthorized | Self::SessionPending => Severity::Info,
            Self::RateLimited(_) | Self::InvalidQuantity(_) => Severity::Warning,
            Self::Http(_) | Self::Api { .. } | Self::Parse(_) => Severity::Error,
        }
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

/// Add a breadcrumb for a cart action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of cart
/// actions leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added line", Some(&[("sku", "TEE-M")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
