pub mod backend;
pub mod chunk;
pub mod file;
pub mod preprocess;
pub mod window;

#[cfg(feature = "microphone")]
pub mod microphone;

pub use backend::{CaptureConfig, CaptureFactory, CaptureKind, CaptureSource};
pub use chunk::{AudioChunk, AudioWindow};
pub use file::{chunk_cadence, AudioFile, FileCapture};
pub use preprocess::Preprocessor;
pub use window::AudioWindowBuffer;
