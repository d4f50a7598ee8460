/// A block of mono float samples delivered by a capture source
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Capture timestamp in milliseconds since the source started
    pub timestamp_ms: u64,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, sample_rate: u32, timestamp_ms: u64) -> Self {
        Self {
            samples,
            sample_rate,
            timestamp_ms,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration covered by this chunk in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }
}

/// A sealed, fixed-length window of samples
///
/// Always exactly `window_length` samples long when produced by
/// [`AudioWindowBuffer`](super::AudioWindowBuffer). Fields are private so a
/// window cannot be resized after sealing.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioWindow {
    samples: Vec<f32>,
    sample_rate: u32,
    sequence: u64,
    start_ms: u64,
}

impl AudioWindow {
    pub fn new(samples: Vec<f32>, sample_rate: u32, sequence: u64, start_ms: u64) -> Self {
        Self {
            samples,
            sample_rate,
            sequence,
            start_ms,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Window number (0-indexed) within the buffer that sealed it
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Timestamp of the first chunk that contributed to this window
    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Peak absolute amplitude
    pub fn max_abs(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Same window metadata with a new sample vector
    pub(crate) fn with_samples(&self, samples: Vec<f32>) -> Self {
        Self {
            samples,
            sample_rate: self.sample_rate,
            sequence: self.sequence,
            start_ms: self.start_ms,
        }
    }
}
