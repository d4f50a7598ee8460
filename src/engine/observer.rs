use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use super::state::{ConnectionState, QualityTier};
use crate::protocol::DetectionResult;

/// Everything the engine reports to the outside world
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    ConnectionStateChanged(ConnectionState),
    ConnectionQualityChanged { tier: QualityTier, score: u8 },
    DetectionResult(DetectionResult),
    Error(String),
    Connected,
    Disconnected { code: u16, reason: String },
}

/// Callbacks invoked by the transport client
///
/// Notifications are delivered after the client finished the transition that
/// produced them, never from inside it. All methods default to no-ops.
pub trait EngineObserver: Send {
    fn on_connection_state_change(&mut self, _state: ConnectionState) {}

    fn on_connection_quality_change(&mut self, _tier: QualityTier, _score: u8) {}

    fn on_detection_result(&mut self, _result: &DetectionResult) {}

    fn on_error(&mut self, _message: &str) {}

    fn on_connect(&mut self) {}

    fn on_disconnect(&mut self, _code: u16, _reason: &str) {}

    /// Route a notification to the matching callback
    fn notify(&mut self, notification: &Notification) {
        match notification {
            Notification::ConnectionStateChanged(state) => self.on_connection_state_change(*state),
            Notification::ConnectionQualityChanged { tier, score } => {
                self.on_connection_quality_change(*tier, *score)
            }
            Notification::DetectionResult(result) => self.on_detection_result(result),
            Notification::Error(message) => self.on_error(message),
            Notification::Connected => self.on_connect(),
            Notification::Disconnected { code, reason } => self.on_disconnect(*code, reason),
        }
    }
}

/// Observer that ignores everything
#[derive(Debug, Default)]
pub struct NullObserver;

impl EngineObserver for NullObserver {}

/// Forwards notifications into a channel for the event loop
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<Notification>) -> Self {
        Self { tx }
    }
}

impl EngineObserver for ChannelObserver {
    fn notify(&mut self, notification: &Notification) {
        let _ = self.tx.send(notification.clone());
    }
}

/// Keeps every notification for later inspection
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    log: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// State changes in the order they were reported
    pub fn states(&self) -> Vec<ConnectionState> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::ConnectionStateChanged(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn tiers(&self) -> Vec<QualityTier> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::ConnectionQualityChanged { tier, .. } => Some(tier),
                _ => None,
            })
            .collect()
    }

    pub fn results(&self) -> Vec<DetectionResult> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::DetectionResult(result) => Some(result),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut log) = self.log.lock() {
            log.clear();
        }
    }
}

impl EngineObserver for RecordingObserver {
    fn notify(&mut self, notification: &Notification) {
        if let Ok(mut log) = self.log.lock() {
            log.push(notification.clone());
        }
    }
}
