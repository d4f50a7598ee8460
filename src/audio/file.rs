use std::path::{Path, PathBuf};
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::{downmix_to_mono, CaptureConfig, CaptureSource};
use super::chunk::AudioChunk;
use crate::error::CaptureError;

/// A decoded audio file, downmixed to mono
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    /// Channel count of the source file (samples are already mono)
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioFile {
    /// Decode any format symphonia understands (WAV, FLAC, MP3, OGG, M4A)
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let file = std::fs::File::open(path)?;
        let stream = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| CaptureError::Decode(e.to_string()))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| CaptureError::Decode("no audio track found".to_string()))?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let sample_rate = params
            .sample_rate
            .ok_or_else(|| CaptureError::Decode("unknown sample rate".to_string()))?;
        let channels = params.channels.map(|c| c.count()).unwrap_or(1).max(1);

        let mut decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| CaptureError::Decode(e.to_string()))?;

        let mut interleaved: Vec<f32> = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(CaptureError::Decode(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let mut buffer =
                        SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
                    buffer.copy_interleaved_ref(decoded);
                    interleaved.extend_from_slice(buffer.samples());
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt packet: skip it and keep going
                    warn!("Skipping undecodable packet: {}", e);
                }
                Err(e) => return Err(CaptureError::Decode(e.to_string())),
            }
        }

        let samples = downmix_to_mono(&interleaved, channels);
        let duration_seconds = samples.len() as f64 / sample_rate as f64;

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            sample_rate,
            channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate,
            channels: channels as u16,
            samples,
        })
    }

    /// Samples converted to `target_rate` by linear interpolation
    pub fn resampled(&self, target_rate: u32) -> Vec<f32> {
        resample_linear(&self.samples, self.sample_rate, target_rate)
    }
}

/// Linear-interpolation resampler, adequate for replaying fixtures
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / ratio).floor() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos.floor() as usize;
            let frac = (pos - idx as f64) as f32;
            let a = samples[idx.min(last)];
            let b = samples[(idx + 1).min(last)];
            a + (b - a) * frac
        })
        .collect()
}

/// Time one chunk covers at `sample_rate`, never below 1µs
pub fn chunk_cadence(chunk_size: usize, sample_rate: u32) -> Duration {
    let micros = chunk_size as u64 * 1_000_000 / sample_rate.max(1) as u64;
    Duration::from_micros(micros.max(1))
}

/// Replays an audio file as a stream of capture chunks
pub struct FileCapture {
    path: PathBuf,
    config: CaptureConfig,
    realtime: bool,
    task: Option<JoinHandle<()>>,
}

impl FileCapture {
    pub fn new(path: impl Into<PathBuf>, config: CaptureConfig, realtime: bool) -> Self {
        Self {
            path: path.into(),
            config,
            realtime,
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureSource for FileCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        if self.task.is_some() {
            return Err(CaptureError::Unsupported(format!(
                "{} is already capturing",
                self.path.display()
            )));
        }

        // Decoding is CPU-bound; keep it off the event loop
        let path = self.path.clone();
        let audio = tokio::task::spawn_blocking(move || AudioFile::open(path))
            .await
            .map_err(|e| CaptureError::Decode(format!("decoder task failed: {}", e)))??;

        let sample_rate = self.config.sample_rate;
        let samples = audio.resampled(sample_rate);
        let chunk_size = self.config.chunk_size.max(1);
        let realtime = self.realtime;
        let cadence = chunk_cadence(chunk_size, sample_rate);

        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let name = audio.path.clone();

        let task = tokio::spawn(async move {
            info!("File capture started: {} ({} samples)", name, samples.len());
            let mut ticker = realtime.then(|| tokio::time::interval(cadence));

            for (index, block) in samples.chunks(chunk_size).enumerate() {
                if let Some(ticker) = ticker.as_mut() {
                    ticker.tick().await;
                }

                let timestamp_ms = index as u64 * chunk_size as u64 * 1000 / sample_rate.max(1) as u64;
                let chunk = AudioChunk::new(block.to_vec(), sample_rate, timestamp_ms);

                if realtime {
                    // Like a device callback: never wait on a slow consumer
                    if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(chunk) {
                        warn!("Capture channel full, dropping chunk {}", index);
                    }
                    if tx.is_closed() {
                        break;
                    }
                } else if tx.send(chunk).await.is_err() {
                    break;
                }
            }

            debug!("File capture finished: {}", name);
        });

        self.task = Some(task);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("File capture stopped: {}", self.path.display());
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    fn name(&self) -> &str {
        "file"
    }
}
