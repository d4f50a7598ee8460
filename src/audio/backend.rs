use std::path::PathBuf;
use tokio::sync::mpsc;

use super::chunk::AudioChunk;
use crate::error::CaptureError;

/// Configuration shared by capture sources
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Sample rate delivered to the window buffer
    pub sample_rate: u32,
    /// Samples per chunk (device cadence is `chunk_size / sample_rate`)
    pub chunk_size: usize,
    /// Capacity of the chunk channel between the source and the event loop
    pub channel_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            chunk_size: 1024,
            channel_capacity: 64,
        }
    }
}

/// Audio capture source
///
/// Implementations:
/// - File: decode an audio file and replay it at device cadence
/// - Microphone: cpal input device (feature `microphone`)
///
/// Sources deliver mono f32 chunks over a bounded channel. A full channel
/// drops chunks on the source side so capture never blocks on the engine.
#[async_trait::async_trait]
pub trait CaptureSource: Send {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio chunks. The channel
    /// closes when the source is exhausted or stopped.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Check if the source is currently capturing
    fn is_capturing(&self) -> bool;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Which capture source to build
#[derive(Debug, Clone)]
pub enum CaptureKind {
    /// Default (or named) microphone input
    Microphone { device: Option<String> },
    /// Audio file replay, optionally paced in real time
    File { path: PathBuf, realtime: bool },
}

/// Capture source factory
pub struct CaptureFactory;

impl CaptureFactory {
    pub fn create(
        kind: CaptureKind,
        config: CaptureConfig,
    ) -> Result<Box<dyn CaptureSource>, CaptureError> {
        match kind {
            CaptureKind::File { path, realtime } => {
                let source = super::file::FileCapture::new(path, config, realtime);
                Ok(Box::new(source))
            }

            CaptureKind::Microphone { device } => {
                #[cfg(feature = "microphone")]
                {
                    let source = super::microphone::MicrophoneCapture::new(device, config)?;
                    Ok(Box::new(source))
                }

                #[cfg(not(feature = "microphone"))]
                {
                    let _ = (device, config);
                    Err(CaptureError::Unsupported(
                        "microphone capture requires the `microphone` feature".to_string(),
                    ))
                }
            }
        }
    }
}

/// Average interleaved frames down to one channel
pub fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
