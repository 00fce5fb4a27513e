//! Protocol modules: payload map, envelope shapes, typed event vocabularies.
//!
//! Everything here is infallible past JSON parsing: unknown event names and
//! missing or mistyped fields degrade to pass-through variants and zero
//! values instead of errors, so a single odd notification never poisons a
//! channel.

pub mod envelope;
pub mod event;
pub mod payload;

pub use envelope::Envelope;
pub use event::{DecodeEvent, GlobalEvent, SessionEvent};
pub use payload::Payload;
