//! Shared listener fixtures for host integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use evbridge_core::channel::Scope;
use evbridge_core::error::{BridgeError, Result};
use evbridge_core::protocol::Payload;
use evbridge_host::config::BridgeConfig;
use evbridge_host::{Bridge, EventListener};

/// Records every event (and malformed delivery) it sees.
pub struct Recorder {
    id: String,
    scope: Scope,
    pub events: Mutex<Vec<(String, Payload)>>,
    pub malformed: Mutex<Vec<(String, String)>>,
}

impl Recorder {
    pub fn new(id: &str, scope: Scope) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            scope,
            events: Mutex::new(Vec::new()),
            malformed: Mutex::new(Vec::new()),
        })
    }

    pub fn names(&self) -> Vec<String> {
        self.events.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl EventListener for Recorder {
    fn id(&self) -> &str {
        &self.id
    }

    fn scope(&self) -> Scope {
        self.scope
    }

    fn on_event(&self, name: &str, payload: &Payload) -> Result<()> {
        self.events.lock().unwrap().push((name.to_string(), payload.clone()));
        Ok(())
    }

    fn on_malformed(&self, name: &str, raw: &str, _err: &BridgeError) {
        self.malformed.lock().unwrap().push((name.to_string(), raw.to_string()));
    }
}

/// Always fails; panics instead when `panic` is set.
pub struct Faulty {
    pub id: String,
    pub scope: Scope,
    pub panic: bool,
}

impl EventListener for Faulty {
    fn id(&self) -> &str {
        &self.id
    }

    fn scope(&self) -> Scope {
        self.scope
    }

    fn on_event(&self, name: &str, _payload: &Payload) -> Result<()> {
        if self.panic {
            panic!("faulty listener blew up on {name}");
        }
        Err(BridgeError::listener(format!("cannot handle {name}")))
    }
}

/// Bridge with default config and the engine attached.
pub fn attached_bridge() -> Bridge {
    let bridge = Bridge::new(&BridgeConfig::default());
    bridge.attach_engine();
    bridge
}
