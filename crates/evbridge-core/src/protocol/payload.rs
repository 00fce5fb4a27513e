//! Event payload: a JSON object with defaulting accessors.
//!
//! Accessors never fail. A missing key or a value of the wrong type yields the
//! zero value of the requested type (`""`, `0`, `false`); wrong-typed values
//! are logged at debug level so anomalies stay visible without aborting the
//! envelope.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Parse a UTF-8 JSON object.
    ///
    /// An empty (or whitespace-only) string is an empty payload. Anything that
    /// is not a JSON object is `MalformedPayload`.
    pub fn parse(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::new());
        }
        match serde_json::from_str::<Value>(json) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(other) => Err(BridgeError::MalformedPayload(format!(
                "expected a JSON object, got {}",
                type_name(&other)
            ))),
            Err(e) => Err(BridgeError::MalformedPayload(e.to_string())),
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    pub fn str_or_default(&self, key: &str) -> String {
        match self.0.get(key) {
            Some(Value::String(s)) => s.clone(),
            None => String::new(),
            Some(other) => {
                mistyped(key, "string", other);
                String::new()
            }
        }
    }

    pub fn bool_or_default(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(b)) => *b,
            None => false,
            Some(other) => {
                mistyped(key, "bool", other);
                false
            }
        }
    }

    pub fn i64_or_default(&self, key: &str) -> i64 {
        match self.0.get(key) {
            Some(Value::Number(n)) if n.is_i64() => n.as_i64().unwrap_or_default(),
            None => 0,
            Some(other) => {
                mistyped(key, "i64", other);
                0
            }
        }
    }

    pub fn u64_or_default(&self, key: &str) -> u64 {
        match self.0.get(key) {
            Some(Value::Number(n)) if n.is_u64() => n.as_u64().unwrap_or_default(),
            None => 0,
            Some(other) => {
                mistyped(key, "u64", other);
                0
            }
        }
    }

    pub fn u32_or_default(&self, key: &str) -> u32 {
        match self.0.get(key) {
            Some(Value::Number(n)) => match n.as_u64().map(u32::try_from) {
                Some(Ok(v)) => v,
                _ => {
                    mistyped(key, "u32", &Value::Number(n.clone()));
                    0
                }
            },
            None => 0,
            Some(other) => {
                mistyped(key, "u32", other);
                0
            }
        }
    }

    /// Integer carried as decimal text (`"7"`), as the connection-manager
    /// events send it. A JSON number is accepted as well.
    pub fn text_i64_or_default(&self, key: &str) -> i64 {
        match self.0.get(key) {
            Some(Value::String(s)) => s.trim().parse().unwrap_or_else(|_| {
                mistyped(key, "i64 text", &Value::String(s.clone()));
                0
            }),
            Some(Value::Number(_)) => self.i64_or_default(key),
            None => 0,
            Some(other) => {
                mistyped(key, "i64 text", other);
                0
            }
        }
    }

    /// Boolean carried as `"true"` / `"false"` text. A JSON bool is accepted
    /// as well.
    pub fn text_bool_or_default(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(Value::String(s)) => match s.trim() {
                "true" => true,
                "false" => false,
                _ => {
                    mistyped(key, "bool text", &Value::String(s.clone()));
                    false
                }
            },
            Some(Value::Bool(b)) => *b,
            None => false,
            Some(other) => {
                mistyped(key, "bool text", other);
                false
            }
        }
    }

    /// First string-valued entry whose key is not in `skip`, as `(key, value)`.
    pub fn first_str_entry(&self, skip: &[&str]) -> Option<(String, String)> {
        self.0.iter().find_map(|(k, v)| match v {
            Value::String(s) if !skip.contains(&k.as_str()) => Some((k.clone(), s.clone())),
            _ => None,
        })
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn mistyped(key: &str, expected: &'static str, got: &Value) {
    tracing::debug!(field = key, expected, got = type_name(got), "payload field has unexpected type; using default");
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
