//! evbridge host runtime.
//!
//! Wires the channel registry, dispatch router, listener adapters, and the
//! bridge surface the native engine and the host application call into. It
//! is intended to be consumed by embedding applications, by the demo binary
//! (`main.rs`), and by integration tests.

pub mod bridge;
pub mod cm;
pub mod config;
pub mod dispatch;
pub mod listener;
pub mod obs;
pub mod registry;

pub use bridge::Bridge;
pub use dispatch::{DispatchReport, PushOutcome};
pub use listener::{EventListener, GlobalListener, SessionListener};
pub use registry::{ChannelRegistry, Registration};
