//! Top-level facade crate for evbridge.
//!
//! Re-exports core types and the host runtime so users can depend on a single crate.

pub mod core {
    pub use evbridge_core::*;
}

pub mod host {
    pub use evbridge_host::*;
}
