use tracing::{debug, trace};

use super::chunk::{AudioChunk, AudioWindow};

/// Accumulates capture chunks into fixed-length windows
///
/// Once `window_length` samples are available the oldest `window_length`
/// samples are sealed into an [`AudioWindow`] and the accumulator is cleared.
/// Samples beyond the window boundary are discarded, so no audio is ever sent
/// twice and memory stays bounded to one window.
#[derive(Debug)]
pub struct AudioWindowBuffer {
    window_length: usize,
    sample_rate: u32,
    accumulator: Vec<f32>,
    window_start_ms: Option<u64>,
    windows_emitted: u64,
    samples_discarded: u64,
}

impl AudioWindowBuffer {
    pub fn new(window_length: usize, sample_rate: u32) -> Self {
        let window_length = window_length.max(1);
        Self {
            window_length,
            sample_rate,
            accumulator: Vec::with_capacity(window_length),
            window_start_ms: None,
            windows_emitted: 0,
            samples_discarded: 0,
        }
    }

    /// Buffer sized for `window_duration_ms` of audio at `sample_rate`
    pub fn for_duration(sample_rate: u32, window_duration_ms: u64) -> Self {
        let window_length = (sample_rate as u64 * window_duration_ms / 1000) as usize;
        Self::new(window_length, sample_rate)
    }

    /// Append a chunk, returning a sealed window once enough samples arrived
    ///
    /// Empty chunks are ignored without touching the accumulator.
    pub fn push(&mut self, chunk: &AudioChunk) -> Option<AudioWindow> {
        if chunk.is_empty() {
            trace!("Ignoring empty audio chunk at {}ms", chunk.timestamp_ms);
            return None;
        }

        if self.window_start_ms.is_none() {
            self.window_start_ms = Some(chunk.timestamp_ms);
        }
        self.accumulator.extend_from_slice(&chunk.samples);

        if self.accumulator.len() < self.window_length {
            return None;
        }

        let overflow = self.accumulator.len() - self.window_length;
        if overflow > 0 {
            debug!("Discarding {} samples past window boundary", overflow);
            self.samples_discarded += overflow as u64;
        }

        let mut samples = std::mem::replace(
            &mut self.accumulator,
            Vec::with_capacity(self.window_length),
        );
        samples.truncate(self.window_length);

        let window = AudioWindow::new(
            samples,
            self.sample_rate,
            self.windows_emitted,
            self.window_start_ms.take().unwrap_or(chunk.timestamp_ms),
        );
        self.windows_emitted += 1;

        Some(window)
    }

    /// Drop any partially accumulated window
    pub fn clear(&mut self) {
        self.accumulator.clear();
        self.window_start_ms = None;
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    /// Samples currently waiting for the next window
    pub fn buffered(&self) -> usize {
        self.accumulator.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accumulator.is_empty()
    }

    pub fn windows_emitted(&self) -> u64 {
        self.windows_emitted
    }

    pub fn samples_discarded(&self) -> u64 {
        self.samples_discarded
    }
}
