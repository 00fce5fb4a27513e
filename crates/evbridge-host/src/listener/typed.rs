use std::marker::PhantomData;

use evbridge_core::channel::Scope;
use evbridge_core::error::{BridgeError, Result};
use evbridge_core::protocol::{DecodeEvent, GlobalEvent, Payload, SessionEvent};

use super::EventListener;

/// Host logic invoked with a decoded event.
pub trait EventHandler<E>: Send + Sync + 'static {
    fn handle(&self, event: E) -> Result<()>;
}

impl<E, F> EventHandler<E> for F
where
    F: Fn(E) -> Result<()> + Send + Sync + 'static,
{
    fn handle(&self, event: E) -> Result<()> {
        self(event)
    }
}

type MalformedHook = Box<dyn Fn(&str, &str, &BridgeError) + Send + Sync>;

/// Adapter that decodes into `E` before calling the handler.
pub struct TypedListener<E, H> {
    id: String,
    handler: H,
    malformed: Option<MalformedHook>,
    _event: PhantomData<fn(E)>,
}

/// App-type scoped adapter.
pub type GlobalListener<H> = TypedListener<GlobalEvent, H>;
/// Session scoped adapter.
pub type SessionListener<H> = TypedListener<SessionEvent, H>;

impl<E, H> TypedListener<E, H>
where
    E: DecodeEvent,
    H: EventHandler<E>,
{
    pub fn new(id: impl Into<String>, handler: H) -> Self {
        Self {
            id: id.into(),
            handler,
            malformed: None,
            _event: PhantomData,
        }
    }

    /// Receive undecodable events as `(name, raw, error)`.
    pub fn with_malformed_hook(
        mut self,
        hook: impl Fn(&str, &str, &BridgeError) + Send + Sync + 'static,
    ) -> Self {
        self.malformed = Some(Box::new(hook));
        self
    }
}

impl<E, F> TypedListener<E, F>
where
    E: DecodeEvent,
    F: Fn(E) -> Result<()> + Send + Sync + 'static,
{
    /// Closure-backed adapter.
    pub fn from_fn(id: impl Into<String>, f: F) -> Self {
        Self::new(id, f)
    }
}

impl<E, H> EventListener for TypedListener<E, H>
where
    E: DecodeEvent,
    H: EventHandler<E>,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn scope(&self) -> Scope {
        E::SCOPE
    }

    fn on_event(&self, name: &str, payload: &Payload) -> Result<()> {
        let event = E::decode(name, payload);
        if event.is_other() {
            tracing::debug!(listener = %self.id, event = %name, "unrecognized event, passing through");
        }
        self.handler.handle(event)
    }

    fn on_malformed(&self, name: &str, raw: &str, err: &BridgeError) {
        tracing::warn!(listener = %self.id, event = %name, error = %err, "undecodable payload");
        if let Some(hook) = &self.malformed {
            hook(name, raw, err);
        }
    }
}
