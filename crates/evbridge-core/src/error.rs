//! Shared error type across evbridge crates.

use thiserror::Error;

/// Diagnostic classes (stable API, used as log/metric labels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Invalid channel key or the bridge cannot accept registrations.
    Registration,
    /// Payload is not a JSON object, or too large to decode.
    Decode,
    /// A listener failed while handling a decoded event.
    Listener,
    /// Invalid configuration.
    Config,
    /// Anything else.
    Internal,
}

impl ErrorClass {
    /// String representation used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::Registration => "REGISTRATION",
            ErrorClass::Decode => "DECODE",
            ErrorClass::Listener => "LISTENER",
            ErrorClass::Config => "CONFIG",
            ErrorClass::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Unified error type used by core and host.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid channel key: {0}")]
    InvalidChannelKey(String),
    #[error("app type not allowed: {0}")]
    AppTypeNotAllowed(String),
    #[error("native engine not attached")]
    EngineUnavailable,
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("payload too large ({size} > {limit} bytes)")]
    PayloadTooLarge { size: usize, limit: usize },
    #[error("listener failed: {0}")]
    Listener(String),
    #[error("listener panicked: {0}")]
    ListenerPanicked(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("invalid config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Map an error to its diagnostic class.
    pub fn class(&self) -> ErrorClass {
        match self {
            BridgeError::InvalidChannelKey(_)
            | BridgeError::AppTypeNotAllowed(_)
            | BridgeError::EngineUnavailable => ErrorClass::Registration,
            BridgeError::MalformedPayload(_) | BridgeError::PayloadTooLarge { .. } => {
                ErrorClass::Decode
            }
            BridgeError::Listener(_) | BridgeError::ListenerPanicked(_) => ErrorClass::Listener,
            BridgeError::UnsupportedVersion | BridgeError::Config(_) => ErrorClass::Config,
            BridgeError::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Convenience constructor for listener implementations.
    pub fn listener(msg: impl Into<String>) -> Self {
        BridgeError::Listener(msg.into())
    }
}
