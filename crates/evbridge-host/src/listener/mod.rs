//! Listener adapters.
//!
//! [`EventListener`] is the single capability the router invokes. Concrete
//! adapters:
//! - [`GlobalListener`] / [`SessionListener`]: decode the payload into a
//!   typed event and hand it to a host handler, inline on the pushing thread.
//! - [`EventStream`]: enqueue into a bounded channel and return (asynchronous
//!   handling; the host drains the receiver at its own pace).

mod stream;
mod typed;

use evbridge_core::channel::Scope;
use evbridge_core::error::{BridgeError, Result};
use evbridge_core::protocol::Payload;

pub use stream::{EventReceiver, EventStream, StreamedEvent};
pub use typed::{EventHandler, GlobalListener, SessionListener, TypedListener};

/// How a listener completes its work relative to `push`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handled before `on_event` returns.
    Inline,
    /// Enqueued; handled later by the consumer.
    Queued,
}

/// Event receiving capability.
///
/// Called on whichever thread pushed the event. Implementations report
/// failures through the returned `Result`; the router also contains panics.
/// Neither reaches the push caller or sibling listeners.
pub trait EventListener: Send + Sync + 'static {
    /// Identity within a channel. Registering a second listener with the
    /// same id under the same key replaces the first.
    fn id(&self) -> &str;

    /// Namespace this listener accepts events from.
    fn scope(&self) -> Scope;

    fn on_event(&self, name: &str, payload: &Payload) -> Result<()>;

    /// Called instead of `on_event` when the payload could not be decoded.
    fn on_malformed(&self, name: &str, raw: &str, err: &BridgeError) {
        tracing::warn!(
            listener = %self.id(),
            event = %name,
            raw_len = raw.len(),
            error = %err,
            "dropping undecodable event"
        );
    }

    fn delivery(&self) -> Delivery {
        Delivery::Inline
    }
}
