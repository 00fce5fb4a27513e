use std::time::Duration;

use serde::Deserialize;

use evbridge_core::channel::{KeyRules, Scope};
use evbridge_core::error::{BridgeError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    pub version: u32,

    #[serde(default)]
    pub bridge: BridgeSection,

    /// Optional allowlist of global app types. Empty means any.
    #[serde(default)]
    pub app_types: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            version: 1,
            bridge: BridgeSection::default(),
            app_types: Vec::new(),
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(BridgeError::UnsupportedVersion);
        }

        self.bridge.validate()?;

        let rules = self.bridge.key_rules();
        for app_type in &self.app_types {
            rules
                .check(Scope::Global, app_type)
                .map_err(|e| BridgeError::Config(format!("app_types entry rejected: {e}")))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeSection {
    /// Registrations fail while the native engine is detached.
    #[serde(default = "default_require_engine")]
    pub require_engine: bool,

    #[serde(default = "default_max_channel_key_len")]
    pub max_channel_key_len: usize,

    /// Session ids must parse as UUIDs.
    #[serde(default)]
    pub strict_session_ids: bool,

    /// Larger payloads are handed to the listeners' malformed path undecoded.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    #[serde(default = "default_slow_listener_warn_ms")]
    pub slow_listener_warn_ms: u64,

    /// Queue capacity for event streams.
    #[serde(default = "default_stream_capacity")]
    pub stream_capacity: usize,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            require_engine: default_require_engine(),
            max_channel_key_len: default_max_channel_key_len(),
            strict_session_ids: false,
            max_payload_bytes: default_max_payload_bytes(),
            slow_listener_warn_ms: default_slow_listener_warn_ms(),
            stream_capacity: default_stream_capacity(),
        }
    }
}

impl BridgeSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=1024).contains(&self.max_channel_key_len) {
            return Err(BridgeError::Config(
                "bridge.max_channel_key_len must be between 1 and 1024".into(),
            ));
        }
        if !(64..=16 * 1024 * 1024).contains(&self.max_payload_bytes) {
            return Err(BridgeError::Config(
                "bridge.max_payload_bytes must be between 64 and 16777216".into(),
            ));
        }
        if !(1..=60000).contains(&self.slow_listener_warn_ms) {
            return Err(BridgeError::Config(
                "bridge.slow_listener_warn_ms must be between 1 and 60000".into(),
            ));
        }
        if !(1..=65536).contains(&self.stream_capacity) {
            return Err(BridgeError::Config(
                "bridge.stream_capacity must be between 1 and 65536".into(),
            ));
        }
        Ok(())
    }

    pub fn key_rules(&self) -> KeyRules {
        KeyRules {
            max_len: self.max_channel_key_len,
            strict_session_ids: self.strict_session_ids,
        }
    }

    pub fn slow_listener_warn(&self) -> Duration {
        Duration::from_millis(self.slow_listener_warn_ms)
    }
}

fn default_require_engine() -> bool {
    true
}
fn default_max_channel_key_len() -> usize {
    128
}
fn default_max_payload_bytes() -> usize {
    64 * 1024
}
fn default_slow_listener_warn_ms() -> u64 {
    50
}
fn default_stream_capacity() -> usize {
    256
}
