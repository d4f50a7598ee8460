use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Verdict for one audio window, sent by the inference service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Session the window belonged to, if the server tagged it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Server-side timestamp of the prediction
    pub timestamp: f64,
    /// 0 = normal, 1 = anomaly
    pub prediction: u8,
    /// Model confidence (0.0 to 1.0)
    pub confidence: f64,
    /// "OK" or "NG"
    #[serde(default)]
    pub status: String,
    /// Human-readable verdict
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<f64>,
    /// Samples the server actually scored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_length: Option<u64>,
    /// Non-fatal processing issue reported alongside the verdict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl DetectionResult {
    pub fn is_anomaly(&self) -> bool {
        self.prediction == 1
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        if self.prediction > 1 {
            return Err(ProtocolError::InvalidField {
                field: "prediction",
                reason: format!("expected 0 or 1, got {}", self.prediction),
            });
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ProtocolError::InvalidField {
                field: "confidence",
                reason: format!("expected value in [0, 1], got {}", self.confidence),
            });
        }
        Ok(())
    }
}

/// Every frame exchanged with the inference service
///
/// Frames are single-line JSON objects tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolMessage {
    /// Server → client, first frame after the socket opens
    ConnectionEstablished {
        client_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    StartRecording {
        session_id: String,
        timestamp: u64,
    },
    StopRecording {
        session_id: String,
        timestamp: u64,
    },
    /// Server acknowledgement of `start_recording`
    RecordingStarted {
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Server acknowledgement of `stop_recording`
    RecordingStopped {
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    AudioData {
        /// Base64-encoded little-endian f32 samples
        data: String,
        sample_rate: u32,
        session_id: String,
        timestamp: u64,
        /// Number of samples in `data`
        data_size: usize,
    },
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<f64>,
    },
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<f64>,
    },
    DetectionResult(DetectionResult),
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
}

impl ProtocolMessage {
    /// Parse and validate one text frame
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let message: ProtocolMessage = serde_json::from_str(text)?;
        if let ProtocolMessage::DetectionResult(result) = &message {
            result.validate()?;
        }
        Ok(message)
    }

    /// Serialize to a single-line JSON frame
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wire name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolMessage::ConnectionEstablished { .. } => "connection_established",
            ProtocolMessage::StartRecording { .. } => "start_recording",
            ProtocolMessage::StopRecording { .. } => "stop_recording",
            ProtocolMessage::RecordingStarted { .. } => "recording_started",
            ProtocolMessage::RecordingStopped { .. } => "recording_stopped",
            ProtocolMessage::AudioData { .. } => "audio_data",
            ProtocolMessage::Ping { .. } => "ping",
            ProtocolMessage::Pong { .. } => "pong",
            ProtocolMessage::DetectionResult(_) => "detection_result",
            ProtocolMessage::Error { .. } => "error",
        }
    }

    /// Session this message is bound to, if any
    pub fn session_id(&self) -> Option<&str> {
        match self {
            ProtocolMessage::StartRecording { session_id, .. }
            | ProtocolMessage::StopRecording { session_id, .. }
            | ProtocolMessage::AudioData { session_id, .. } => Some(session_id),
            ProtocolMessage::RecordingStarted { session_id, .. }
            | ProtocolMessage::RecordingStopped { session_id, .. }
            | ProtocolMessage::Error { session_id, .. } => session_id.as_deref(),
            ProtocolMessage::DetectionResult(result) => result.session_id.as_deref(),
            ProtocolMessage::ConnectionEstablished { .. }
            | ProtocolMessage::Ping { .. }
            | ProtocolMessage::Pong { .. } => None,
        }
    }
}
