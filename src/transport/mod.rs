//! Socket transport seam
//!
//! The engine never touches a socket directly. It drives a [`Transport`]
//! (open/send/close, all non-blocking) and is fed [`TransportEvent`]s by
//! whoever owns the event loop. Every event carries the [`ConnectionId`] it
//! belongs to so events from a socket the engine already abandoned are
//! recognisable and ignored.

mod mock;
mod websocket;

pub use mock::{MockTransport, MockTransportHandle};
pub use websocket::WebSocketTransport;

use crate::error::TransportError;

/// Monotonic identifier of one `open()` call
pub type ConnectionId = u64;

/// Something that happened on a connection
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened {
        conn: ConnectionId,
    },
    Message {
        conn: ConnectionId,
        text: String,
    },
    Closed {
        conn: ConnectionId,
        code: u16,
        reason: String,
    },
    Error {
        conn: ConnectionId,
        message: String,
    },
}

impl TransportEvent {
    pub fn conn(&self) -> ConnectionId {
        match self {
            TransportEvent::Opened { conn }
            | TransportEvent::Message { conn, .. }
            | TransportEvent::Closed { conn, .. }
            | TransportEvent::Error { conn, .. } => *conn,
        }
    }
}

/// Non-blocking socket operations used by the transport client
pub trait Transport: Send {
    /// Begin opening a connection. Completion is reported as an event.
    fn open(&mut self, conn: ConnectionId, url: &str) -> Result<(), TransportError>;

    /// Queue one text frame on the open connection
    fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Close the current connection, if any. No event is expected back.
    fn close(&mut self, code: u16, reason: &str);

    /// Whether the current connection can accept frames
    fn is_open(&self) -> bool;
}
