//! Channel keys.
//!
//! Global (app-type) and session channels live in separate namespaces: the
//! scope is part of the key, so `"abc"` as an app type and `"abc"` as a
//! session id never collide. Listings render keys with a scope prefix
//! (`global:main`, `session:7f0c...`).

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{BridgeError, Result};

/// Namespace a channel key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Application-type scope.
    Global,
    /// Per-connection scope.
    Session,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Session => "session",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation rules applied when a raw string becomes a [`ChannelKey`].
#[derive(Debug, Clone, Copy)]
pub struct KeyRules {
    pub max_len: usize,
    /// Require session ids to be UUIDs.
    pub strict_session_ids: bool,
}

impl Default for KeyRules {
    fn default() -> Self {
        Self {
            max_len: 128,
            strict_session_ids: false,
        }
    }
}

impl KeyRules {
    pub fn check(&self, scope: Scope, raw: &str) -> Result<()> {
        if raw.is_empty() {
            return Err(BridgeError::InvalidChannelKey(format!("empty {scope} key")));
        }
        if raw.len() > self.max_len {
            return Err(BridgeError::InvalidChannelKey(format!(
                "{scope} key longer than {} bytes",
                self.max_len
            )));
        }
        if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(BridgeError::InvalidChannelKey(format!(
                "{scope} key contains whitespace or control characters: {raw:?}"
            )));
        }
        if scope == Scope::Session && self.strict_session_ids {
            uuid::Uuid::parse_str(raw).map_err(|e| {
                BridgeError::InvalidChannelKey(format!("session id is not a uuid: {raw} ({e})"))
            })?;
        }
        Ok(())
    }
}

/// A validated channel key: scope + name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelKey {
    scope: Scope,
    name: Arc<str>,
}

impl ChannelKey {
    /// Validate `raw` under `rules` and build a key.
    pub fn new(scope: Scope, raw: &str, rules: &KeyRules) -> Result<Self> {
        rules.check(scope, raw)?;
        Ok(Self {
            scope,
            name: Arc::from(raw),
        })
    }

    /// Global key validated with default rules.
    pub fn global(app_type: &str) -> Result<Self> {
        Self::new(Scope::Global, app_type, &KeyRules::default())
    }

    /// Session key validated with default rules.
    pub fn session(session_id: &str) -> Result<Self> {
        Self::new(Scope::Session, session_id, &KeyRules::default())
    }

    /// Parse the prefixed form produced by `Display` (`global:main`).
    pub fn parse_tagged(s: &str, rules: &KeyRules) -> Result<Self> {
        let (scope, name) = s.split_once(':').ok_or_else(|| {
            BridgeError::InvalidChannelKey(format!("missing scope prefix: {s}"))
        })?;
        let scope = match scope {
            "global" => Scope::Global,
            "session" => Scope::Session,
            other => {
                return Err(BridgeError::InvalidChannelKey(format!(
                    "unknown scope prefix: {other}"
                )))
            }
        };
        Self::new(scope, name, rules)
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.name)
    }
}
