//! Channel registry: `ChannelKey -> [listener...]` in registration order.
//!
//! Each channel's listener list is an immutable `Arc<[ListenerHandle]>`.
//! Mutations build a new list and swap it in while holding the entry's
//! shard lock; lookups clone the `Arc` and release the lock before any
//! listener runs. A push therefore sees the list from before or after a
//! mutation, never a mix, and listeners may (un)register from inside
//! `on_event` without deadlocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use evbridge_core::channel::{ChannelKey, Scope};
use evbridge_core::error::{BridgeError, Result};

use crate::listener::EventListener;

/// One registered listener.
#[derive(Clone)]
pub struct ListenerHandle {
    listener: Arc<dyn EventListener>,
    scope: Scope,
    seq: u64,
}

impl ListenerHandle {
    pub fn listener(&self) -> &Arc<dyn EventListener> {
        &self.listener
    }

    pub fn id(&self) -> &str {
        self.listener.id()
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Registry-wide registration sequence number. A replacement gets a
    /// fresh one while keeping its delivery slot.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Snapshot of one channel's listeners, in delivery order.
pub type Listeners = Arc<[ListenerHandle]>;

/// Result of a successful registration.
pub enum Registration {
    /// New identity appended to the channel.
    Inserted,
    /// Same identity was present; its slot now holds the new listener.
    Replaced(Arc<dyn EventListener>),
    /// The exact same listener object was already registered.
    Unchanged,
}

#[derive(Default)]
pub struct ChannelRegistry {
    channels: DashMap<ChannelKey, Listeners>,
    seq: AtomicU64,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    /// Insert `listener` under `key`, or replace the listener with the same id.
    /// A replacement keeps the original delivery position.
    pub fn register(&self, key: ChannelKey, listener: Arc<dyn EventListener>) -> Result<Registration> {
        if listener.scope() != key.scope() {
            return Err(BridgeError::InvalidChannelKey(format!(
                "{} listener {} cannot listen on {key}",
                listener.scope(),
                listener.id()
            )));
        }

        let handle = ListenerHandle {
            scope: key.scope(),
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            listener,
        };
        tracing::debug!(channel = %key, listener = %handle.id(), listener_seq = handle.seq, "registering listener");

        match self.channels.entry(key) {
            Entry::Vacant(v) => {
                v.insert(Arc::from(vec![handle]));
                Ok(Registration::Inserted)
            }
            Entry::Occupied(mut o) => {
                let current = o.get();
                match current.iter().position(|h| h.id() == handle.id()) {
                    Some(i) if same_listener(&current[i].listener, &handle.listener) => {
                        Ok(Registration::Unchanged)
                    }
                    Some(i) => {
                        let mut next = current.to_vec();
                        let old = std::mem::replace(&mut next[i], handle);
                        o.insert(Arc::from(next));
                        Ok(Registration::Replaced(old.listener))
                    }
                    None => {
                        let mut next = current.to_vec();
                        next.push(handle);
                        o.insert(Arc::from(next));
                        Ok(Registration::Inserted)
                    }
                }
            }
        }
    }

    /// Remove every listener under `key`. Returns the removed count.
    pub fn unregister(&self, key: &ChannelKey) -> usize {
        self.channels
            .remove(key)
            .map(|(_, listeners)| listeners.len())
            .unwrap_or(0)
    }

    /// Remove one listener by id. Drops the channel when it becomes empty.
    pub fn unregister_listener(&self, key: &ChannelKey, id: &str) -> bool {
        let Entry::Occupied(mut o) = self.channels.entry(key.clone()) else {
            return false;
        };
        let next: Vec<ListenerHandle> = o.get().iter().filter(|h| h.id() != id).cloned().collect();
        if next.len() == o.get().len() {
            return false;
        }
        if next.is_empty() {
            o.remove();
        } else {
            o.insert(Arc::from(next));
        }
        true
    }

    /// Listeners for `key` at this instant.
    pub fn lookup(&self, key: &ChannelKey) -> Option<Listeners> {
        self.channels.get(key).map(|r| Arc::clone(r.value()))
    }

    /// Registered channel keys, sorted (global before session, then by name).
    pub fn channels(&self) -> Vec<ChannelKey> {
        let mut keys: Vec<ChannelKey> = self.channels.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn listener_count(&self, key: &ChannelKey) -> usize {
        self.channels.get(key).map(|r| r.value().len()).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Drop everything (teardown). Returns the number of listeners removed.
    pub fn clear(&self) -> usize {
        let keys: Vec<ChannelKey> = self.channels.iter().map(|e| e.key().clone()).collect();
        keys.iter().map(|k| self.unregister(k)).sum()
    }
}

fn same_listener(a: &Arc<dyn EventListener>, b: &Arc<dyn EventListener>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
