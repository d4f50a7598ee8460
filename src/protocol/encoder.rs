use base64::Engine;

use crate::audio::AudioWindow;

/// Bytes per encoded sample (f32, little-endian)
pub const BYTES_PER_SAMPLE: usize = 4;

/// Raw bytes encoded per base64 pass. A multiple of 3 so pass outputs
/// concatenate without padding in between.
pub const DEFAULT_ENCODE_BLOCK: usize = 3 * 8192;

/// A window ready to ship as an `audio_data` frame
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedPayload {
    /// Base64 of the little-endian f32 samples
    pub data: String,
    pub sample_rate: u32,
    /// Number of samples encoded
    pub sample_count: usize,
    /// Window sequence number the payload came from
    pub sequence: u64,
}

/// Serializes windows into transport-safe payloads
#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    block_size: usize,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_ENCODE_BLOCK,
        }
    }
}

impl FrameEncoder {
    /// Encoder with a custom block size, rounded down to a multiple of 3 bytes
    pub fn with_block_size(block_size: usize) -> Self {
        let block_size = (block_size / 3).max(1) * 3;
        Self { block_size }
    }

    /// Encode a window, or `None` for an empty one
    pub fn encode(&self, window: &AudioWindow) -> Option<EncodedPayload> {
        let samples = window.samples();
        if samples.is_empty() {
            return None;
        }

        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();

        let mut data = String::with_capacity(bytes.len().div_ceil(3) * 4);
        for block in bytes.chunks(self.block_size) {
            base64::engine::general_purpose::STANDARD.encode_string(block, &mut data);
        }

        Some(EncodedPayload {
            data,
            sample_rate: window.sample_rate(),
            sample_count: samples.len(),
            sequence: window.sequence(),
        })
    }
}

/// Decode an `audio_data` payload back into samples
pub fn decode_samples(data: &str) -> Result<Vec<f32>, base64::DecodeError> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(data)?;
    Ok(bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
