//! Session mode for the cart surfaces.

use serde::Serialize;

/// The client's belief about whether the current shopper is signed in.
///
/// `Unknown` is the transient state while a previously-issued credential is
/// being checked. It resolves to exactly one of the other two and is never
/// re-entered within the lifetime of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Guest,
    Authenticated,
    #[default]
    Unknown,
}

impl SessionMode {
    /// Whether the mode has been resolved.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Guest => write!(f, "guest"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unknown() {
        assert_eq!(SessionMode::default(), SessionMode::Unknown);
        assert!(!SessionMode::Unknown.is_settled());
        assert!(SessionMode::Guest.is_settled());
        assert!(SessionMode::Authenticated.is_settled());
    }

    #[test]
    fn test_display() {
        assert_eq!(SessionMode::Authenticated.to_string(), "authenticated");
        assert_eq!(SessionMode::Guest.to_string(), "guest");
    }
}
