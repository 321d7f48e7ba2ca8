//! Cartsync Core - Shared cart types.
//!
//! This crate provides the types used across all cartsync components:
//! - `client` - Guest cart storage, remote cart gateway, reconciliation
//! - `cli` - Command-line driver for the client
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Cart lines, SKUs, session mode, bearer tokens and prices

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
