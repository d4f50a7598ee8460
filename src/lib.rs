pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod protocol;
pub mod runtime;
pub mod transport;

pub use audio::{
    AudioChunk, AudioFile, AudioWindow, AudioWindowBuffer, CaptureConfig, CaptureFactory,
    CaptureKind, CaptureSource, FileCapture, Preprocessor,
};
pub use config::Config;
pub use engine::{
    ClientConfig, ClientSnapshot, ConnectionState, EngineObserver, HealthMonitor, MessageQueue,
    Notification, QualityTier, ReconnectionPolicy, Session, StopOutcome, TransportClient,
};
pub use error::{CaptureError, EngineError, ProtocolError, TransportError};
pub use http::{create_router, AppState};
pub use pipeline::AudioPipeline;
pub use protocol::{DetectionResult, EncodedPayload, FrameEncoder, ProtocolMessage};
pub use runtime::{EngineHandle, EngineRuntime, RuntimeOptions};
pub use transport::{MockTransport, Transport, TransportEvent, WebSocketTransport};
