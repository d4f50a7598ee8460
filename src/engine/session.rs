use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One recording session, valid only on the connection that started it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque identifier sent with every session-bound message
    pub session_id: String,

    /// When the server-facing `start_recording` went out
    pub started_at: DateTime<Utc>,

    /// Connection the session belongs to
    pub connection: u64,

    /// Whether the server acknowledged with `recording_started`
    pub acknowledged: bool,
}

impl Session {
    pub fn new(connection: u64, started_at_ms: u64) -> Self {
        Self {
            session_id: format!("session_{}", uuid::Uuid::new_v4()),
            started_at: Utc
                .timestamp_millis_opt(started_at_ms as i64)
                .single()
                .unwrap_or_else(Utc::now),
            connection,
            acknowledged: false,
        }
    }
}

/// Counters exposed through the diagnostics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStats {
    /// Frames handed to the transport
    pub messages_sent: u64,

    /// Messages parked in the queue
    pub messages_queued: u64,

    /// Queued messages lost to overflow
    pub messages_dropped: u64,

    /// Queued messages purged because their session ended
    pub messages_purged: u64,

    /// Inbound frames that failed to decode
    pub protocol_errors: u64,

    /// `detection_result` frames received
    pub results_received: u64,

    /// Results with prediction = 1
    pub anomalies_detected: u64,

    /// `audio_data` frames sent or queued
    pub windows_sent: u64,

    /// Sessions started on the server
    pub sessions_started: u64,
}
