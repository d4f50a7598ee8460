use std::sync::{Arc, Mutex, MutexGuard};

use super::{ConnectionId, Transport};
use crate::error::TransportError;
use crate::protocol::ProtocolMessage;

#[derive(Debug, Default)]
struct MockState {
    opened: Vec<(ConnectionId, String)>,
    sent: Vec<String>,
    closed: Vec<(u16, String)>,
    open: bool,
    fail_open: bool,
    fail_sends: usize,
}

/// In-memory transport for tests and dry runs
///
/// Records every open/send/close. Connection events are not generated here;
/// the test feeds them to the client itself. A [`MockTransportHandle`] keeps
/// access to the recorded state after the transport moves into the client.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// Inspection and control side of a [`MockTransport`]
#[derive(Debug, Clone)]
pub struct MockTransportHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> (Self, MockTransportHandle) {
        let transport = Self::default();
        let handle = MockTransportHandle {
            state: Arc::clone(&transport.state),
        };
        (transport, handle)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Transport for MockTransport {
    fn open(&mut self, conn: ConnectionId, url: &str) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.fail_open {
            return Err(TransportError::Connect("mock open failure".to_string()));
        }
        state.opened.push((conn, url.to_string()));
        // Becomes open once the test delivers `Opened`
        state.open = false;
        Ok(())
    }

    fn send(&mut self, frame: String) -> Result<(), TransportError> {
        let mut state = self.lock();
        if !state.open {
            return Err(TransportError::NotOpen);
        }
        if state.fail_sends > 0 {
            state.fail_sends -= 1;
            return Err(TransportError::Send("mock send failure".to_string()));
        }
        state.sent.push(frame);
        Ok(())
    }

    fn close(&mut self, code: u16, reason: &str) {
        let mut state = self.lock();
        state.open = false;
        state.closed.push((code, reason.to_string()));
    }

    fn is_open(&self) -> bool {
        self.lock().open
    }
}

impl MockTransportHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mark the socket open or closed (pair with feeding the matching event)
    pub fn set_open(&self, open: bool) {
        self.lock().open = open;
    }

    /// Make the next `count` sends fail
    pub fn fail_next_sends(&self, count: usize) {
        self.lock().fail_sends = count;
    }

    pub fn fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    /// Raw frames sent so far
    pub fn sent(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// Sent frames decoded back into messages
    pub fn sent_messages(&self) -> Vec<ProtocolMessage> {
        self.lock()
            .sent
            .iter()
            .filter_map(|frame| serde_json::from_str(frame).ok())
            .collect()
    }

    /// Wire names of the sent frames, in order
    pub fn sent_kinds(&self) -> Vec<&'static str> {
        self.sent_messages().iter().map(|m| m.kind()).collect()
    }

    pub fn clear_sent(&self) {
        self.lock().sent.clear();
    }

    pub fn opened(&self) -> Vec<(ConnectionId, String)> {
        self.lock().opened.clone()
    }

    pub fn open_count(&self) -> usize {
        self.lock().opened.len()
    }

    pub fn closed(&self) -> Vec<(u16, String)> {
        self.lock().closed.clone()
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }
}
