use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use evbridge_core::channel::{ChannelKey, Scope};
use evbridge_core::error::{BridgeError, Result};
use evbridge_core::protocol::{Envelope, Payload};

use super::{Delivery, EventListener};
use crate::obs::BridgeMetrics;

/// One event as seen by a stream consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamedEvent {
    pub channel: ChannelKey,
    pub envelope: Envelope,
}

pub type EventReceiver = mpsc::Receiver<StreamedEvent>;

/// Queueing adapter: forwards events into a bounded channel.
///
/// A full queue drops the event for this stream only. A dropped receiver
/// turns every later push into a listener error until the stream is
/// unregistered.
pub struct EventStream {
    id: String,
    channel: ChannelKey,
    tx: mpsc::Sender<StreamedEvent>,
    dropped: AtomicU64,
    metrics: Arc<BridgeMetrics>,
}

impl EventStream {
    pub fn new(
        id: impl Into<String>,
        channel: ChannelKey,
        capacity: usize,
        metrics: Arc<BridgeMetrics>,
    ) -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let stream = Self {
            id: id.into(),
            channel,
            tx,
            dropped: AtomicU64::new(0),
            metrics,
        };
        (stream, rx)
    }

    /// Events dropped on a full queue so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl EventListener for EventStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn scope(&self) -> Scope {
        self.channel.scope()
    }

    fn on_event(&self, name: &str, payload: &Payload) -> Result<()> {
        let ev = StreamedEvent {
            channel: self.channel.clone(),
            envelope: Envelope::new(name, payload.clone()),
        };
        match self.tx.try_send(ev) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                self.metrics
                    .stream_drops
                    .inc(&[("scope", self.channel.scope().as_str())]);
                // log every 100th drop
                if dropped % 100 == 1 {
                    tracing::warn!(stream = %self.id, channel = %self.channel, dropped, "event stream full, dropping events");
                }
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(BridgeError::listener(format!("stream {} closed", self.id)))
            }
        }
    }

    fn delivery(&self) -> Delivery {
        Delivery::Queued
    }
}
