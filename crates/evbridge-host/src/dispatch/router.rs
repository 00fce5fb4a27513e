use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use evbridge_core::channel::ChannelKey;
use evbridge_core::error::BridgeError;
use evbridge_core::protocol::Envelope;

use crate::listener::Delivery;
use crate::obs::BridgeMetrics;
use crate::registry::{ChannelRegistry, ListenerHandle, Listeners};

/// What happened to one push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Nothing is registered under the key. Not an error.
    NoListener,
    Dispatched(DispatchReport),
}

impl PushOutcome {
    /// True when at least one listener was invoked.
    pub fn is_dispatched(&self) -> bool {
        matches!(self, PushOutcome::Dispatched(_))
    }

    pub fn report(&self) -> Option<DispatchReport> {
        match self {
            PushOutcome::Dispatched(r) => Some(*r),
            PushOutcome::NoListener => None,
        }
    }
}

/// Per-push delivery counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Listeners that returned `Ok` (queued adapters included).
    pub delivered: usize,
    /// Of `delivered`, how many only enqueued the event.
    pub queued: usize,
    /// Listeners that returned an error or panicked.
    pub failed: usize,
    /// The payload could not be decoded; listeners got the raw text instead.
    pub malformed: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct DispatchLimits {
    pub max_payload_bytes: usize,
    pub slow_listener_warn: Duration,
}

impl Default for DispatchLimits {
    fn default() -> Self {
        Self {
            max_payload_bytes: 64 * 1024,
            slow_listener_warn: Duration::from_millis(50),
        }
    }
}

/// Fans one event out to every listener of a channel, in registration order,
/// on the calling thread.
///
/// Listener errors and panics are contained here: they are logged with the
/// channel and event name, counted, and delivery moves on to the next
/// listener.
pub struct Router {
    registry: Arc<ChannelRegistry>,
    metrics: Arc<BridgeMetrics>,
    limits: DispatchLimits,
}

impl Router {
    pub fn new(registry: Arc<ChannelRegistry>, metrics: Arc<BridgeMetrics>, limits: DispatchLimits) -> Self {
        Self {
            registry,
            metrics,
            limits,
        }
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Push an already decoded envelope.
    pub fn push(&self, key: &ChannelKey, env: &Envelope) -> PushOutcome {
        let Some(listeners) = self.listeners(key) else {
            return PushOutcome::NoListener;
        };
        self.fan_out(key, &listeners, env)
    }

    /// Push a split-shape event: name plus JSON payload text.
    pub fn push_json(&self, key: &ChannelKey, name: &str, json: &str) -> PushOutcome {
        let Some(listeners) = self.listeners(key) else {
            return PushOutcome::NoListener;
        };
        match self.check_size(json).and_then(|_| Envelope::parse(name, json)) {
            Ok(env) => self.fan_out(key, &listeners, &env),
            Err(e) => self.fan_out_malformed(key, &listeners, name, json, &e),
        }
    }

    /// Push a wire-shape event: one JSON object with the name embedded.
    pub fn push_wire(&self, key: &ChannelKey, json: &str) -> PushOutcome {
        let Some(listeners) = self.listeners(key) else {
            return PushOutcome::NoListener;
        };
        match self.check_size(json).and_then(|_| Envelope::from_wire(json)) {
            Ok(env) => self.fan_out(key, &listeners, &env),
            Err(e) => self.fan_out_malformed(key, &listeners, "", json, &e),
        }
    }

    fn listeners(&self, key: &ChannelKey) -> Option<Listeners> {
        let listeners = self.registry.lookup(key);
        if listeners.is_none() {
            tracing::debug!(channel = %key, "no listener registered");
            self.metrics
                .pushes
                .inc(&[("scope", key.scope().as_str()), ("outcome", "no_listener")]);
        }
        listeners
    }

    fn check_size(&self, json: &str) -> evbridge_core::Result<()> {
        if json.len() > self.limits.max_payload_bytes {
            return Err(BridgeError::PayloadTooLarge {
                size: json.len(),
                limit: self.limits.max_payload_bytes,
            });
        }
        Ok(())
    }

    fn fan_out(&self, key: &ChannelKey, listeners: &[ListenerHandle], env: &Envelope) -> PushOutcome {
        let scope = key.scope().as_str();
        let started = Instant::now();
        let mut report = DispatchReport::default();

        for handle in listeners {
            let listener = handle.listener();
            let t0 = Instant::now();
            let res = catch_unwind(AssertUnwindSafe(|| listener.on_event(&env.name, &env.payload)));
            self.warn_if_slow(key, &env.name, handle, t0.elapsed());

            match res {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    if listener.delivery() == Delivery::Queued {
                        report.queued += 1;
                    }
                }
                Ok(Err(e)) => {
                    report.failed += 1;
                    self.metrics
                        .listener_failures
                        .inc(&[("scope", scope), ("kind", "error")]);
                    tracing::warn!(
                        channel = %key,
                        event = %env.name,
                        listener = %handle.id(),
                        class = e.class().as_str(),
                        error = %e,
                        "listener failed"
                    );
                }
                Err(panic) => {
                    report.failed += 1;
                    self.metrics
                        .listener_failures
                        .inc(&[("scope", scope), ("kind", "panic")]);
                    let e = BridgeError::ListenerPanicked(panic_message(panic.as_ref()));
                    tracing::error!(
                        channel = %key,
                        event = %env.name,
                        listener = %handle.id(),
                        class = e.class().as_str(),
                        error = %e,
                        "listener panicked"
                    );
                }
            }
        }

        let outcome = if report.delivered > 0 { "delivered" } else { "all_failed" };
        self.metrics.pushes.inc(&[("scope", scope), ("outcome", outcome)]);
        self.metrics
            .dispatch_duration
            .observe(&[("scope", scope)], started.elapsed());
        PushOutcome::Dispatched(report)
    }

    fn fan_out_malformed(
        &self,
        key: &ChannelKey,
        listeners: &[ListenerHandle],
        name: &str,
        raw: &str,
        err: &BridgeError,
    ) -> PushOutcome {
        let scope = key.scope().as_str();
        tracing::warn!(channel = %key, event = %name, class = err.class().as_str(), error = %err, "payload decode failed");
        self.metrics.decode_errors.inc(&[("scope", scope)]);

        let mut report = DispatchReport {
            malformed: true,
            ..DispatchReport::default()
        };
        for handle in listeners {
            let listener = handle.listener();
            match catch_unwind(AssertUnwindSafe(|| listener.on_malformed(name, raw, err))) {
                Ok(()) => report.delivered += 1,
                Err(panic) => {
                    report.failed += 1;
                    self.metrics
                        .listener_failures
                        .inc(&[("scope", scope), ("kind", "panic")]);
                    tracing::error!(
                        channel = %key,
                        event = %name,
                        listener = %handle.id(),
                        panic = %panic_message(panic.as_ref()),
                        "listener panicked in malformed handler"
                    );
                }
            }
        }

        self.metrics
            .pushes
            .inc(&[("scope", scope), ("outcome", "malformed")]);
        PushOutcome::Dispatched(report)
    }

    fn warn_if_slow(&self, key: &ChannelKey, name: &str, handle: &ListenerHandle, took: Duration) {
        if took > self.limits.slow_listener_warn {
            tracing::warn!(
                channel = %key,
                event = %name,
                listener = %handle.id(),
                took_ms = took.as_millis() as u64,
                "slow listener"
            );
        }
    }
}

fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
