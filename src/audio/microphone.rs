use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::backend::{downmix_to_mono, CaptureConfig, CaptureSource};
use super::chunk::AudioChunk;
use super::file::resample_linear;
use crate::error::CaptureError;

/// Live microphone capture through cpal
///
/// cpal streams are not `Send`, so the stream lives on a dedicated thread and
/// forwards chunks over the capture channel with `try_send`.
pub struct MicrophoneCapture {
    device_name: Option<String>,
    config: CaptureConfig,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl MicrophoneCapture {
    pub fn new(device_name: Option<String>, config: CaptureConfig) -> Result<Self, CaptureError> {
        // Fail fast if the device is missing rather than on start
        find_device(device_name.as_deref())?;

        Ok(Self {
            device_name,
            config,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        })
    }
}

fn find_device(name: Option<&str>) -> Result<cpal::Device, CaptureError> {
    let host = cpal::default_host();
    match name {
        Some(name) => {
            let mut devices = host
                .input_devices()
                .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
            devices
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| {
                    CaptureError::DeviceUnavailable(format!("input device '{}' not found", name))
                })
        }
        None => host.default_input_device().ok_or_else(|| {
            CaptureError::DeviceUnavailable("no default input device available".to_string())
        }),
    }
}

/// Re-chunks device callbacks into fixed-size mono chunks at the target rate
struct ChunkForwarder {
    tx: mpsc::Sender<AudioChunk>,
    channels: usize,
    device_rate: u32,
    target_rate: u32,
    chunk_size: usize,
    pending: Vec<f32>,
    started: Instant,
}

impl ChunkForwarder {
    fn push(&mut self, data: &[f32]) {
        let mono = downmix_to_mono(data, self.channels);
        let resampled = resample_linear(&mono, self.device_rate, self.target_rate);
        self.pending.extend_from_slice(&resampled);

        while self.pending.len() >= self.chunk_size {
            let rest = self.pending.split_off(self.chunk_size);
            let samples = std::mem::replace(&mut self.pending, rest);
            let timestamp_ms = self.started.elapsed().as_millis() as u64;
            let chunk = AudioChunk::new(samples, self.target_rate, timestamp_ms);
            if let Err(mpsc::error::TrySendError::Full(_)) = self.tx.try_send(chunk) {
                warn!("Capture channel full, dropping microphone chunk");
            }
        }
    }
}

#[async_trait::async_trait]
impl CaptureSource for MicrophoneCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CaptureError::Unsupported("microphone already capturing".to_string()));
        }

        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), CaptureError>>();
        let running = Arc::clone(&self.running);
        let device_name = self.device_name.clone();
        let config = self.config.clone();

        running.store(true, Ordering::SeqCst);

        let thread = std::thread::spawn(move || {
            let stream = match build_stream(device_name.as_deref(), &config, tx) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));

            while running.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(50));
            }

            if let Err(e) = stream.pause() {
                warn!("Failed to pause microphone stream: {}", e);
            }
            drop(stream);
            info!("Microphone capture thread stopped");
        });

        let ready = tokio::task::spawn_blocking(move || ready_rx.recv())
            .await
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?
            .map_err(|_| CaptureError::DeviceUnavailable("capture thread exited".to_string()))?;

        if let Err(e) = ready {
            self.running.store(false, Ordering::SeqCst);
            let _ = thread.join();
            return Err(e);
        }

        self.thread = Some(thread);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            tokio::task::spawn_blocking(move || thread.join())
                .await
                .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?
                .map_err(|_| {
                    CaptureError::DeviceUnavailable("capture thread panicked".to_string())
                })?;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

fn build_stream(
    device_name: Option<&str>,
    config: &CaptureConfig,
    tx: mpsc::Sender<AudioChunk>,
) -> Result<cpal::Stream, CaptureError> {
    let device = find_device(device_name)?;
    let default_config = device
        .default_input_config()
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
    let format = default_config.sample_format();
    let stream_config: StreamConfig = default_config.into();

    let mut forwarder = ChunkForwarder {
        tx,
        channels: usize::from(stream_config.channels.max(1)),
        device_rate: stream_config.sample_rate.0,
        target_rate: config.sample_rate,
        chunk_size: config.chunk_size.max(1),
        pending: Vec::new(),
        started: Instant::now(),
    };

    info!(
        "Microphone config: format={:?} rate={}Hz channels={}",
        format, forwarder.device_rate, forwarder.channels
    );

    let err_fn = |err| error!("Microphone stream error: {}", err);

    let stream = match format {
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _| forwarder.push(data),
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _| {
                let converted: Vec<f32> = data.iter().map(|&s| s as f32 / 32_768.0).collect();
                forwarder.push(&converted);
            },
            err_fn,
            None,
        ),
        other => {
            return Err(CaptureError::Unsupported(format!(
                "unsupported sample format: {:?}",
                other
            )))
        }
    }
    .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

    stream
        .play()
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

    Ok(stream)
}
