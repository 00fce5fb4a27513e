//! evbridge core: channel keys, payload decoding, typed events, and errors.
//!
//! This crate defines the contracts shared by the host runtime and anything
//! that produces events for it (the native engine glue, host-side
//! notifiers, tests). It carries no runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Malformed input
//! surfaces as `BridgeError` or decodes to defaults.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod channel;
pub mod error;
pub mod protocol;

pub use channel::{ChannelKey, KeyRules, Scope};
/// Shared result type.
pub use error::{BridgeError, ErrorClass, Result};
