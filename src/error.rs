use thiserror::Error;

use crate::engine::ConnectionState;

/// Failures reported by a [`Transport`](crate::transport::Transport) implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport is not open")]
    NotOpen,

    #[error("transport channel closed")]
    ChannelClosed,

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("send failed: {0}")]
    Send(String),
}

/// A server frame that could not be turned into a [`ProtocolMessage`](crate::protocol::ProtocolMessage)
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Errors returned by the public commands of the transport client
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("not connected (state: {state})")]
    NotConnected { state: ConnectionState },

    #[error("session {session_id} is already recording")]
    AlreadyRecording { session_id: String },

    #[error("no active session")]
    NoActiveSession,

    #[error("engine runtime is not running")]
    RuntimeStopped,

    #[error(transparent)]
    Send(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Audio capture failures. These are fatal for the current run and never retried.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("unsupported audio source: {0}")]
    Unsupported(String),

    #[error("failed to decode audio: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
