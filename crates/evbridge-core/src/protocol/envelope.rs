//! Event envelope (name + payload).
//!
//! The engine hands events over in two shapes:
//! - split: `(event_name, json_payload)`, parsed with [`Envelope::parse`];
//! - wire: one self-describing JSON object with the name embedded under
//!   `name` (or `type` for frame notifications), parsed with
//!   [`Envelope::from_wire`]. The name key is stripped from the payload.

use serde_json::Value;

use crate::error::Result;
use crate::protocol::payload::Payload;

/// Key carrying the event name in the wire shape.
pub const NAME_KEY: &str = "name";
/// Fallback name key used by frame notifications (`{"type":"rgba",...}`).
pub const TYPE_KEY: &str = "type";

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub name: String,
    pub payload: Payload,
}

impl Envelope {
    pub fn new(name: impl Into<String>, payload: Payload) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Envelope with an empty payload.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, Payload::new())
    }

    /// Split shape: name given out of band, payload as JSON text.
    pub fn parse(name: &str, json: &str) -> Result<Self> {
        Ok(Self::new(name, Payload::parse(json)?))
    }

    /// Wire shape: name embedded in the object. A missing name yields an
    /// empty name, which decodes to the pass-through variant.
    pub fn from_wire(json: &str) -> Result<Self> {
        let mut payload = Payload::parse(json)?;
        let name = take_name(&mut payload, NAME_KEY)
            .or_else(|| take_name(&mut payload, TYPE_KEY))
            .unwrap_or_default();
        Ok(Self { name, payload })
    }

    /// Render back into the wire shape.
    pub fn to_wire(&self) -> String {
        let mut map = self.payload.as_map().clone();
        map.insert(NAME_KEY.to_string(), Value::String(self.name.clone()));
        Value::Object(map).to_string()
    }
}

fn take_name(payload: &mut Payload, key: &str) -> Option<String> {
    match payload.get(key) {
        Some(Value::String(_)) => match payload.remove(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        },
        _ => None,
    }
}
