//! Bridge surface: the entry points the native engine and the host call.
//!
//! Only marshalling lives here: raw strings become validated channel keys,
//! `Result`s become booleans for the engine-facing calls, and everything
//! else is delegated to the registry and the router.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use evbridge_core::channel::{ChannelKey, KeyRules, Scope};
use evbridge_core::error::{BridgeError, Result};
use evbridge_core::protocol::{Envelope, Payload};

use crate::config::BridgeConfig;
use crate::dispatch::{DispatchLimits, PushOutcome, Router};
use crate::listener::{EventListener, EventReceiver, EventStream};
use crate::obs::BridgeMetrics;
use crate::registry::{ChannelRegistry, Registration};

/// Reason sent to a session listener displaced by a different adapter.
pub const REPLACED_REASON: &str = "replaced";

pub struct Bridge {
    rules: KeyRules,
    require_engine: bool,
    stream_capacity: usize,
    app_types: HashSet<String>,
    registry: Arc<ChannelRegistry>,
    router: Router,
    metrics: Arc<BridgeMetrics>,
    engine_attached: AtomicBool,
    current_session: RwLock<Option<String>>,
    stream_seq: AtomicU64,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new(&BridgeConfig::default())
    }
}

impl Bridge {
    pub fn new(cfg: &BridgeConfig) -> Self {
        let registry = Arc::new(ChannelRegistry::new());
        let metrics = Arc::new(BridgeMetrics::default());
        let limits = DispatchLimits {
            max_payload_bytes: cfg.bridge.max_payload_bytes,
            slow_listener_warn: cfg.bridge.slow_listener_warn(),
        };

        Self {
            rules: cfg.bridge.key_rules(),
            require_engine: cfg.bridge.require_engine,
            stream_capacity: cfg.bridge.stream_capacity,
            app_types: cfg.app_types.iter().cloned().collect(),
            router: Router::new(Arc::clone(&registry), Arc::clone(&metrics), limits),
            registry,
            metrics,
            engine_attached: AtomicBool::new(false),
            current_session: RwLock::new(None),
            stream_seq: AtomicU64::new(1),
        }
    }

    // --------------------
    // Engine lifecycle
    // --------------------

    pub fn attach_engine(&self) {
        if !self.engine_attached.swap(true, Ordering::AcqRel) {
            tracing::info!("native engine attached");
        }
    }

    pub fn detach_engine(&self) {
        if self.engine_attached.swap(false, Ordering::AcqRel) {
            tracing::info!("native engine detached");
        }
    }

    pub fn engine_attached(&self) -> bool {
        self.engine_attached.load(Ordering::Acquire)
    }

    // --------------------
    // Keys
    // --------------------

    pub fn global_key(&self, app_type: &str) -> Result<ChannelKey> {
        let key = ChannelKey::new(Scope::Global, app_type, &self.rules)?;
        if !self.app_types.is_empty() && !self.app_types.contains(app_type) {
            return Err(BridgeError::AppTypeNotAllowed(app_type.to_string()));
        }
        Ok(key)
    }

    pub fn session_key(&self, session_id: &str) -> Result<ChannelKey> {
        ChannelKey::new(Scope::Session, session_id, &self.rules)
    }

    // --------------------
    // Host: registration
    // --------------------

    /// Register `listener` for an app type.
    pub fn try_start_global_listening(
        &self,
        app_type: &str,
        listener: Arc<dyn EventListener>,
    ) -> Result<Registration> {
        let key = self.global_key(app_type).map_err(|e| self.rejected(Scope::Global, e))?;
        self.register(key, listener)
    }

    pub fn start_global_listening(&self, app_type: &str, listener: Arc<dyn EventListener>) -> bool {
        self.try_start_global_listening(app_type, listener).is_ok()
    }

    pub fn stop_global_listening(&self, app_type: &str) -> bool {
        match self.global_key(app_type) {
            Ok(key) => self.unregister(&key),
            Err(_) => false,
        }
    }

    /// Register `listener` for a session. If it displaces a different
    /// adapter with the same id, that adapter gets a final
    /// `close {"reason":"replaced"}`.
    pub fn try_start_session_listening(
        &self,
        session_id: &str,
        listener: Arc<dyn EventListener>,
    ) -> Result<Registration> {
        let key = self.session_key(session_id).map_err(|e| self.rejected(Scope::Session, e))?;
        self.register(key, listener)
    }

    pub fn start_session_listening(&self, session_id: &str, listener: Arc<dyn EventListener>) -> bool {
        self.try_start_session_listening(session_id, listener).is_ok()
    }

    pub fn stop_session_listening(&self, session_id: &str) -> bool {
        match self.session_key(session_id) {
            Ok(key) => self.unregister(&key),
            Err(_) => false,
        }
    }

    /// Remove a single listener by id, leaving the rest of the channel intact.
    pub fn stop_listener(&self, key: &ChannelKey, listener_id: &str) -> bool {
        let removed = self.registry.unregister_listener(key, listener_id);
        if removed {
            self.metrics.listeners_active.dec(&[("scope", key.scope().as_str())]);
            self.metrics
                .registrations
                .inc(&[("scope", key.scope().as_str()), ("action", "remove")]);
            tracing::info!(channel = %key, listener = %listener_id, "listener removed");
        }
        removed
    }

    fn register(&self, key: ChannelKey, listener: Arc<dyn EventListener>) -> Result<Registration> {
        let scope = key.scope();
        if self.require_engine && !self.engine_attached() {
            return Err(self.rejected(scope, BridgeError::EngineUnavailable));
        }

        let id = listener.id().to_string();
        let reg = self
            .registry
            .register(key.clone(), listener)
            .map_err(|e| self.rejected(scope, e))?;

        match &reg {
            Registration::Inserted => {
                self.metrics.listeners_active.inc(&[("scope", scope.as_str())]);
                self.metrics
                    .registrations
                    .inc(&[("scope", scope.as_str()), ("action", "insert")]);
                tracing::info!(channel = %key, listener = %id, "listener registered");
            }
            Registration::Replaced(old) => {
                self.metrics
                    .registrations
                    .inc(&[("scope", scope.as_str()), ("action", "replace")]);
                tracing::warn!(channel = %key, listener = %id, "listener was registered before, now replaced");
                if scope == Scope::Session {
                    let notice = Payload::new().with("reason", REPLACED_REASON);
                    let res = catch_unwind(AssertUnwindSafe(|| old.on_event("close", &notice)));
                    if !matches!(res, Ok(Ok(()))) {
                        tracing::debug!(channel = %key, listener = %id, "displaced listener failed on close");
                    }
                }
            }
            Registration::Unchanged => {
                tracing::debug!(channel = %key, listener = %id, "listener already registered");
            }
        }
        Ok(reg)
    }

    fn unregister(&self, key: &ChannelKey) -> bool {
        self.remove_channel(key) > 0
    }

    fn remove_channel(&self, key: &ChannelKey) -> usize {
        let removed = self.registry.unregister(key);
        if removed == 0 {
            return 0;
        }
        let scope = key.scope().as_str();
        self.metrics
            .listeners_active
            .add(&[("scope", scope)], -(removed as i64));
        self.metrics
            .registrations
            .inc(&[("scope", scope), ("action", "remove")]);
        tracing::info!(channel = %key, removed, "channel unregistered");
        removed
    }

    fn rejected(&self, scope: Scope, e: BridgeError) -> BridgeError {
        self.metrics
            .registrations
            .inc(&[("scope", scope.as_str()), ("action", "reject")]);
        tracing::warn!(scope = %scope, class = e.class().as_str(), error = %e, "registration rejected");
        e
    }

    // --------------------
    // Event streams
    // --------------------

    /// Register a queueing listener for an app type and return its receiver.
    pub fn open_global_stream(&self, app_type: &str) -> Result<EventReceiver> {
        let key = self.global_key(app_type).map_err(|e| self.rejected(Scope::Global, e))?;
        self.open_stream(key)
    }

    pub fn open_session_stream(&self, session_id: &str) -> Result<EventReceiver> {
        let key = self.session_key(session_id).map_err(|e| self.rejected(Scope::Session, e))?;
        self.open_stream(key)
    }

    fn open_stream(&self, key: ChannelKey) -> Result<EventReceiver> {
        let id = format!("stream-{}", self.stream_seq.fetch_add(1, Ordering::Relaxed));
        let (stream, rx) = EventStream::new(id, key.clone(), self.stream_capacity, Arc::clone(&self.metrics));
        self.register(key, Arc::new(stream))?;
        Ok(rx)
    }

    // --------------------
    // Engine / host: push
    // --------------------

    /// Split-shape push from the engine for an app type.
    pub fn push_global_event(&self, app_type: &str, name: &str, json: &str) -> bool {
        self.push_raw(Scope::Global, app_type, |router, key| router.push_json(key, name, json))
            .is_dispatched()
    }

    /// Split-shape push from the engine for a session.
    pub fn push_session_event(&self, session_id: &str, name: &str, json: &str) -> bool {
        self.push_raw(Scope::Session, session_id, |router, key| router.push_json(key, name, json))
            .is_dispatched()
    }

    /// Wire-shape push (name embedded in the JSON object) for an app type.
    pub fn push_global_wire(&self, app_type: &str, json: &str) -> bool {
        self.push_raw(Scope::Global, app_type, |router, key| router.push_wire(key, json))
            .is_dispatched()
    }

    /// Wire-shape push for a session.
    pub fn push_session_wire(&self, session_id: &str, json: &str) -> bool {
        self.push_raw(Scope::Session, session_id, |router, key| router.push_wire(key, json))
            .is_dispatched()
    }

    /// Host-originated push with a structured envelope.
    pub fn push(&self, key: &ChannelKey, env: &Envelope) -> PushOutcome {
        self.router.push(key, env)
    }

    fn push_raw(
        &self,
        scope: Scope,
        raw_key: &str,
        f: impl FnOnce(&Router, &ChannelKey) -> PushOutcome,
    ) -> PushOutcome {
        let key = match scope {
            Scope::Global => self.global_key(raw_key),
            Scope::Session => self.session_key(raw_key),
        };
        match key {
            Ok(key) => f(&self.router, &key),
            Err(e) => {
                // nothing can be registered under an invalid key
                tracing::debug!(scope = %scope, key = %raw_key, error = %e, "push to invalid key");
                self.metrics
                    .pushes
                    .inc(&[("scope", scope.as_str()), ("outcome", "invalid_key")]);
                PushOutcome::NoListener
            }
        }
    }

    // --------------------
    // Listing
    // --------------------

    /// Snapshot of registered channels in prefixed form (`global:main`).
    pub fn list_channels(&self) -> Vec<String> {
        self.registry.channels().iter().map(ToString::to_string).collect()
    }

    pub fn list_channels_json(&self) -> String {
        serde_json::to_string(&self.list_channels()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Bare app types with at least one listener.
    pub fn list_global_channels(&self) -> Vec<String> {
        self.registry
            .channels()
            .iter()
            .filter(|k| k.scope() == Scope::Global)
            .map(|k| k.name().to_string())
            .collect()
    }

    // --------------------
    // Current session
    // --------------------

    pub fn set_current_session(&self, session_id: &str) -> Result<()> {
        let key = self.session_key(session_id)?;
        let mut cur = self
            .current_session
            .write()
            .map_err(|_| BridgeError::Internal("current session lock poisoned".into()))?;
        *cur = Some(key.name().to_string());
        Ok(())
    }

    pub fn current_session(&self) -> Option<String> {
        match self.current_session.read() {
            Ok(cur) => cur.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    // --------------------
    // Accessors / teardown
    // --------------------

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn metrics(&self) -> Arc<BridgeMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Drop all registrations. Returns the number of listeners removed.
    pub fn shutdown(&self) -> usize {
        let removed: usize = self
            .registry
            .channels()
            .iter()
            .map(|key| self.remove_channel(key))
            .sum();
        tracing::info!(removed, "bridge shut down");
        removed
    }
}
