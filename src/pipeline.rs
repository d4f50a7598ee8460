use tracing::debug;

use crate::audio::{AudioChunk, AudioWindowBuffer, Preprocessor};
use crate::protocol::{EncodedPayload, FrameEncoder};

/// Capture chunks in, wire-ready payloads out
///
/// Chains the window buffer, the per-window normalisation and the base64
/// encoder. Purely synchronous so it can run inline in the event loop.
#[derive(Debug)]
pub struct AudioPipeline {
    buffer: AudioWindowBuffer,
    preprocessor: Preprocessor,
    encoder: FrameEncoder,
}

impl AudioPipeline {
    pub fn new(buffer: AudioWindowBuffer, preprocessor: Preprocessor, encoder: FrameEncoder) -> Self {
        Self {
            buffer,
            preprocessor,
            encoder,
        }
    }

    /// Pipeline with default normalisation and encoding
    pub fn for_duration(sample_rate: u32, window_duration_ms: u64) -> Self {
        Self::new(
            AudioWindowBuffer::for_duration(sample_rate, window_duration_ms),
            Preprocessor::default(),
            FrameEncoder::default(),
        )
    }

    /// Feed one chunk; returns a payload when a window completes
    pub fn push(&mut self, chunk: &AudioChunk) -> Option<EncodedPayload> {
        let window = self.buffer.push(chunk)?;
        let normalized = self.preprocessor.process(&window);
        let payload = self.encoder.encode(&normalized)?;

        debug!(
            "Window {} ready: {} samples, peak {:.3}",
            payload.sequence,
            payload.sample_count,
            normalized.max_abs()
        );
        Some(payload)
    }

    /// Drop any partial window, e.g. when a new session starts
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    pub fn buffer(&self) -> &AudioWindowBuffer {
        &self.buffer
    }
}
