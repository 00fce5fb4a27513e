//! Typed events decoded from a generic payload.
//!
//! One enum per scope, one variant per known event name, plus an `Other`
//! pass-through. Adding an event means adding a variant and a match arm in
//! `decode`; nothing upstream changes.

use serde::Serialize;

use crate::channel::Scope;
use crate::protocol::envelope::NAME_KEY;
use crate::protocol::payload::Payload;

/// Decode step shared by the typed listener adapters.
pub trait DecodeEvent: Sized + Send + 'static {
    /// Scope this vocabulary belongs to.
    const SCOPE: Scope;

    /// Infallible: unknown names become the pass-through variant and missing
    /// fields take their zero value.
    fn decode(name: &str, payload: &Payload) -> Self;

    /// Event name this value was decoded from.
    fn name(&self) -> &str;

    /// True for the pass-through variant.
    fn is_other(&self) -> bool;
}

/// App-type scoped events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GlobalEvent {
    Connection {
        id: i64,
        peer_id: String,
        connected: bool,
    },
    Permission {
        name: String,
        granted: bool,
    },
    ConfigUpdated,
    /// `add_connection`: client description as JSON text.
    AddConnection {
        client: String,
    },
    /// `on_client_remove`; `id` and `close` arrive as text.
    ClientRemoved {
        id: i64,
        close: bool,
    },
    /// `chat_server_mode`; `id` arrives as text.
    ChatMessage {
        id: i64,
        text: String,
    },
    Theme {
        dark: String,
    },
    Language,
    /// `show` arrives as text.
    ShowElevation {
        show: bool,
    },
    /// `update_voice_call_state`: client description as JSON text.
    VoiceCallState {
        client: String,
    },
    /// `cm_file_transfer_log`: sent as a single `{<action>: <log>}` entry.
    FileTransferLog {
        action: String,
        log: String,
    },
    Other {
        name: String,
    },
}

impl DecodeEvent for GlobalEvent {
    const SCOPE: Scope = Scope::Global;

    fn decode(name: &str, p: &Payload) -> Self {
        match name {
            "connection" => GlobalEvent::Connection {
                id: p.i64_or_default("id"),
                peer_id: p.str_or_default("peer_id"),
                connected: p.bool_or_default("connected"),
            },
            "permission" => GlobalEvent::Permission {
                name: p.str_or_default("name"),
                granted: p.bool_or_default("granted"),
            },
            "config_updated" => GlobalEvent::ConfigUpdated,
            "add_connection" => GlobalEvent::AddConnection {
                client: p.str_or_default("client"),
            },
            "on_client_remove" => GlobalEvent::ClientRemoved {
                id: p.text_i64_or_default("id"),
                close: p.text_bool_or_default("close"),
            },
            "chat_server_mode" => GlobalEvent::ChatMessage {
                id: p.text_i64_or_default("id"),
                text: p.str_or_default("text"),
            },
            "theme" => GlobalEvent::Theme {
                dark: p.str_or_default("dark"),
            },
            "language" => GlobalEvent::Language,
            "show_elevation" => GlobalEvent::ShowElevation {
                show: p.text_bool_or_default("show"),
            },
            "update_voice_call_state" => GlobalEvent::VoiceCallState {
                client: p.str_or_default("client"),
            },
            "cm_file_transfer_log" => {
                let (action, log) = p.first_str_entry(&[NAME_KEY]).unwrap_or_default();
                GlobalEvent::FileTransferLog { action, log }
            }
            other => GlobalEvent::Other {
                name: other.to_string(),
            },
        }
    }

    fn name(&self) -> &str {
        match self {
            GlobalEvent::Connection { .. } => "connection",
            GlobalEvent::Permission { .. } => "permission",
            GlobalEvent::ConfigUpdated => "config_updated",
            GlobalEvent::AddConnection { .. } => "add_connection",
            GlobalEvent::ClientRemoved { .. } => "on_client_remove",
            GlobalEvent::ChatMessage { .. } => "chat_server_mode",
            GlobalEvent::Theme { .. } => "theme",
            GlobalEvent::Language => "language",
            GlobalEvent::ShowElevation { .. } => "show_elevation",
            GlobalEvent::VoiceCallState { .. } => "update_voice_call_state",
            GlobalEvent::FileTransferLog { .. } => "cm_file_transfer_log",
            GlobalEvent::Other { name } => name,
        }
    }

    fn is_other(&self) -> bool {
        matches!(self, GlobalEvent::Other { .. })
    }
}

/// Session scoped events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    VideoFrame {
        width: u32,
        height: u32,
    },
    AudioFrame {
        sample_rate: u32,
    },
    Close {
        reason: String,
    },
    /// A decoded RGBA frame is ready for `display`.
    Rgba {
        display: i64,
    },
    /// A GPU texture frame is ready for `display`.
    Texture {
        display: i64,
        gpu_texture: u64,
    },
    Other {
        name: String,
    },
}

impl DecodeEvent for SessionEvent {
    const SCOPE: Scope = Scope::Session;

    fn decode(name: &str, p: &Payload) -> Self {
        match name {
            "video_frame" => SessionEvent::VideoFrame {
                width: p.u32_or_default("width"),
                height: p.u32_or_default("height"),
            },
            "audio_frame" => SessionEvent::AudioFrame {
                sample_rate: p.u32_or_default("sample_rate"),
            },
            "close" => SessionEvent::Close {
                reason: p.str_or_default("reason"),
            },
            "rgba" => SessionEvent::Rgba {
                display: p.i64_or_default("display"),
            },
            "texture" => SessionEvent::Texture {
                display: p.i64_or_default("display"),
                gpu_texture: p.u64_or_default("gpu_texture"),
            },
            other => SessionEvent::Other {
                name: other.to_string(),
            },
        }
    }

    fn name(&self) -> &str {
        match self {
            SessionEvent::VideoFrame { .. } => "video_frame",
            SessionEvent::AudioFrame { .. } => "audio_frame",
            SessionEvent::Close { .. } => "close",
            SessionEvent::Rgba { .. } => "rgba",
            SessionEvent::Texture { .. } => "texture",
            SessionEvent::Other { name } => name,
        }
    }

    fn is_other(&self) -> bool {
        matches!(self, SessionEvent::Other { .. })
    }
}
