//! Session context.
//!
//! Holds the session mode and the current bearer credential. Constructed
//! once per application instance and shared by reference with every cart
//! surface.

use std::sync::{Mutex, MutexGuard, PoisonError};

use cartsync_core::{BearerToken, SessionMode};

#[derive(Debug, Default)]
struct SessionState {
    mode: SessionMode,
    token: Option<BearerToken>,
}

/// Session mode and credential for the current shopper.
///
/// Starts in [`SessionMode::Unknown`] unless constructed settled. No
/// transition leads back to `Unknown`.
#[derive(Debug, Default)]
pub struct Session {
    state: Mutex<SessionState>,
}

impl Session {
    /// A session whose mode is still being determined.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A settled guest session.
    #[must_use]
    pub fn guest() -> Self {
        let session = Self::new();
        session.revert_to_guest();
        session
    }

    /// A settled authenticated session.
    #[must_use]
    pub fn authenticated(token: BearerToken) -> Self {
        let session = Self::new();
        session.authenticate(token);
        session
    }

    /// Current session mode.
    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.lock().mode
    }

    /// Current credential, present only while authenticated.
    #[must_use]
    pub fn token(&self) -> Option<BearerToken> {
        self.lock().token.clone()
    }

    /// Record a valid credential. Returns the previous mode.
    pub fn authenticate(&self, token: BearerToken) -> SessionMode {
        let mut state = self.lock();
        let previous = state.mode;
        state.mode = SessionMode::Authenticated;
        state.token = Some(token);
        previous
    }

    /// Drop the credential and become a guest. Returns the previous mode.
    pub fn revert_to_guest(&self) -> SessionMode {
        let mut state = self.lock();
        let previous = state.mode;
        state.mode = SessionMode::Guest;
        state.token = None;
        previous
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
