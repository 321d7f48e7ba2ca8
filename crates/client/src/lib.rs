//! Cartsync client library.
//!
//! Lets a shopper build a cart before signing in (held in per-origin
//! key-value storage), then merges that guest cart into the server cart
//! exactly once when a credential is obtained.
//!
//! # Components
//!
//! - [`normalize`] - Total validation of untyped cart line data
//! - [`storage`] - Key-value storage backends (memory, file)
//! - [`local`] - The guest cart store
//! - [`gateway`] - The remote cart API
//! - [`reconcile`] - The one-time guest-to-server merge
//! - [`session`] - Session mode and credential context
//! - [`state`] - The application-wide cart context
//! - [`view`] - The cart view model shared by every cart surface

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod gateway;
pub mod local;
pub mod normalize;
pub mod reconcile;
pub mod session;
pub mod state;
pub mod storage;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ClientConfig;
pub use error::{CartError, Result, Severity};
pub use gateway::{CartGateway, HttpCartGateway};
pub use local::LocalCartStore;
pub use reconcile::{ReconcileOutcome, ReconcileState, ReconciliationCoordinator};
pub use session::Session;
pub use state::CartContext;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use view::{CartSnapshot, CartViewModel, ResponsePolicy};
