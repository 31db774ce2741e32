//! Error types for callwire.

use std::time::Duration;

use thiserror::Error;

/// Main error type for all callwire operations.
///
/// An unknown function name is deliberately absent here: it travels as a
/// regular [`CallResponse`](crate::CallResponse) with `success = false`.
#[derive(Debug, Error)]
pub enum CallwireError {
    /// Invalid configuration detected before serving (zero port, port in use, ...).
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error on the socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Protocol error (invalid frame, wrong flags, unexpected reply, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The peer answered the call with an error frame instead of a response.
    #[error("Remote error: {0}")]
    Remote(String),

    /// Connection closed before a full response arrived.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The configured call timeout elapsed.
    #[error("Call timed out after {0:?}")]
    Timeout(Duration),
}

impl CallwireError {
    /// Whether this error came from the channel rather than from configuration.
    pub fn is_transport(&self) -> bool {
        !matches!(self, CallwireError::Config(_))
    }
}

/// Result type alias using CallwireError.
pub type Result<T> = std::result::Result<T, CallwireError>;
