//! Connection-manager notifier.
//!
//! Host-side producer for the connection-manager vocabulary, pushed straight
//! into the bridge on one app type without a round trip through the native
//! engine. Payloads use the engine's shape: scalars as text, and the
//! transfer log as a single `{<action>: <log>}` entry.

use std::sync::Arc;

use evbridge_core::channel::ChannelKey;
use evbridge_core::error::Result;
use evbridge_core::protocol::{Envelope, Payload};

use crate::bridge::Bridge;
use crate::dispatch::PushOutcome;

/// App type the connection manager publishes on.
pub const CM_APP_TYPE: &str = "main";

#[derive(Clone)]
pub struct CmNotifier {
    bridge: Arc<Bridge>,
    key: ChannelKey,
}

impl CmNotifier {
    pub fn new(bridge: Arc<Bridge>) -> Result<Self> {
        Self::with_app_type(bridge, CM_APP_TYPE)
    }

    pub fn with_app_type(bridge: Arc<Bridge>, app_type: &str) -> Result<Self> {
        let key = bridge.global_key(app_type)?;
        Ok(Self { bridge, key })
    }

    pub fn channel(&self) -> &ChannelKey {
        &self.key
    }

    /// `client_json` is the serialized client description.
    pub fn add_connection(&self, client_json: &str) -> PushOutcome {
        self.push("add_connection", Payload::new().with("client", client_json))
    }

    pub fn remove_connection(&self, id: i64, close: bool) -> PushOutcome {
        self.push(
            "on_client_remove",
            Payload::new()
                .with("id", id.to_string())
                .with("close", close.to_string()),
        )
    }

    pub fn new_message(&self, id: i64, text: &str) -> PushOutcome {
        self.push(
            "chat_server_mode",
            Payload::new().with("id", id.to_string()).with("text", text),
        )
    }

    pub fn change_theme(&self, dark: &str) -> PushOutcome {
        self.push("theme", Payload::new().with("dark", dark))
    }

    pub fn change_language(&self) -> PushOutcome {
        self.push("language", Payload::new())
    }

    pub fn show_elevation(&self, show: bool) -> PushOutcome {
        self.push("show_elevation", Payload::new().with("show", show.to_string()))
    }

    pub fn update_voice_call_state(&self, client_json: &str) -> PushOutcome {
        self.push(
            "update_voice_call_state",
            Payload::new().with("client", client_json),
        )
    }

    pub fn file_transfer_log(&self, action: &str, log: &str) -> PushOutcome {
        self.push("cm_file_transfer_log", Payload::new().with(action, log))
    }

    fn push(&self, name: &str, payload: Payload) -> PushOutcome {
        self.bridge.push(&self.key, &Envelope::new(name, payload))
    }
}
