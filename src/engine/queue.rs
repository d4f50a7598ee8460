use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::protocol::ProtocolMessage;

/// Default capacity of the outbound queue
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 100;

/// Destination for queued messages
pub trait MessageSink {
    /// Whether the connection can take messages right now
    fn is_open(&self) -> bool;

    fn send(&mut self, message: &ProtocolMessage) -> Result<(), TransportError>;
}

/// Outcome of one [`MessageQueue::drain_to`] pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Messages handed to the sink successfully
    pub sent: usize,
    /// The message the sink rejected (dropped, not requeued)
    pub failed: Option<String>,
    /// Messages still queued after the pass
    pub remaining: usize,
}

/// Bounded FIFO of outbound messages held while the socket is unavailable
///
/// Enqueueing into a full queue evicts the oldest entry, so the queue always
/// holds the newest `capacity` messages in their original order.
#[derive(Debug)]
pub struct MessageQueue {
    items: VecDeque<ProtocolMessage>,
    capacity: usize,
    dropped: u64,
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QUEUE_SIZE)
    }
}

impl MessageQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Append a message, returning the evicted head if the queue was full
    pub fn enqueue(&mut self, message: ProtocolMessage) -> Option<ProtocolMessage> {
        let evicted = if self.items.len() >= self.capacity {
            let evicted = self.items.pop_front();
            if let Some(old) = &evicted {
                self.dropped += 1;
                warn!(
                    "Message queue full ({}), dropped oldest {} message",
                    self.capacity,
                    old.kind()
                );
            }
            evicted
        } else {
            None
        };

        self.items.push_back(message);
        evicted
    }

    /// Hand queued messages to `sink` in FIFO order while it stays open
    ///
    /// Stops at the first failed send. The failed message is not requeued;
    /// everything behind it stays queued for the next pass.
    pub fn drain_to(&mut self, sink: &mut dyn MessageSink) -> DrainReport {
        let mut report = DrainReport::default();

        while sink.is_open() {
            let Some(message) = self.items.pop_front() else {
                break;
            };

            match sink.send(&message) {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    warn!("Dropping queued {} message after failed send: {}", message.kind(), e);
                    report.failed = Some(message.kind().to_string());
                    break;
                }
            }
        }

        report.remaining = self.items.len();
        if report.sent > 0 {
            debug!(
                "Drained {} queued messages ({} remaining)",
                report.sent, report.remaining
            );
        }
        report
    }

    /// Keep only the messages matching `keep`; returns how many were removed
    pub fn retain<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&ProtocolMessage) -> bool,
    {
        let before = self.items.len();
        self.items.retain(keep);
        before - self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total messages evicted by overflow
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProtocolMessage> {
        self.items.iter()
    }
}
