//! Wire protocol spoken with the inference service
//!
//! - `messages`: the closed set of JSON frames, decoded once at the boundary
//! - `encoder`: window → base64 float32 payload
//! - `close`: close-code constants and diagnostic reasons

pub mod close;
pub mod encoder;
pub mod messages;

pub use close::close_reason;
pub use encoder::{decode_samples, EncodedPayload, FrameEncoder};
pub use messages::{DetectionResult, ProtocolMessage};
