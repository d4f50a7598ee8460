// Integration tests for audio file decoding and file-backed capture
//
// WAV fixtures are generated on the fly with hound into a temp directory.

use anyhow::Result;
use soundditect_stream::audio::{
    chunk_cadence, AudioFile, CaptureConfig, CaptureFactory, CaptureKind, CaptureSource, FileCapture,
};
use soundditect_stream::CaptureError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn write_wav(dir: &Path, name: &str, sample_rate: u32, channels: u16, frames: usize) -> Result<PathBuf> {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(&path, spec)?;
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let value = (t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.5;
        for _ in 0..channels {
            writer.write_sample((value * i16::MAX as f32) as i16)?;
        }
    }
    writer.finalize()?;
    Ok(path)
}

#[test]
fn test_audio_file_open() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_wav(dir.path(), "tone.wav", 16000, 1, 16000)?;

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.sample_rate, 16000);
    assert_eq!(audio.channels, 1);
    assert_eq!(audio.samples.len(), 16000);
    assert!((audio.duration_seconds - 1.0).abs() < 1e-6);
    assert!(audio.path.contains("tone.wav"));
    assert!(audio.samples.iter().all(|s| s.abs() <= 1.0));

    Ok(())
}

#[test]
fn test_stereo_file_is_downmixed() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_wav(dir.path(), "stereo.wav", 8000, 2, 4000)?;

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.channels, 2);
    assert_eq!(audio.samples.len(), 4000);
    Ok(())
}

#[test]
fn test_audio_file_nonexistent() {
    let path = PathBuf::from("/nonexistent/path/to/audio.wav");
    let result = AudioFile::open(&path);

    assert!(matches!(result, Err(CaptureError::Io(_))));
}

#[test]
fn test_resampled_length() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_wav(dir.path(), "tone.wav", 22050, 1, 22050)?;

    let audio = AudioFile::open(&path)?;
    let resampled = audio.resampled(44100);

    assert!((resampled.len() as i64 - 44100).abs() <= 2);
    Ok(())
}

#[tokio::test]
async fn test_file_capture_delivers_all_chunks() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_wav(dir.path(), "tone.wav", 44100, 1, 10_000)?;

    let config = CaptureConfig {
        sample_rate: 44100,
        chunk_size: 1024,
        channel_capacity: 64,
    };
    let mut capture = FileCapture::new(&path, config, false);
    let mut rx = capture.start().await?;

    let mut total = 0;
    let mut chunks = 0;
    let mut last_timestamp = None;
    while let Some(chunk) = rx.recv().await {
        assert!(chunk.len() <= 1024);
        assert_eq!(chunk.sample_rate, 44100);
        if let Some(previous) = last_timestamp {
            assert!(chunk.timestamp_ms >= previous);
        }
        last_timestamp = Some(chunk.timestamp_ms);
        total += chunk.len();
        chunks += 1;
    }

    assert_eq!(total, 10_000);
    assert_eq!(chunks, 10);
    capture.stop().await?;
    assert!(!capture.is_capturing());
    Ok(())
}

#[test]
fn test_chunk_cadence_never_zero() {
    assert_eq!(chunk_cadence(1024, 44100), Duration::from_micros(23_219));
    assert_eq!(chunk_cadence(1, 2_000_000), Duration::from_micros(1));
    assert_eq!(chunk_cadence(0, 44100), Duration::from_micros(1));
}

#[tokio::test]
async fn test_file_capture_with_sub_microsecond_chunks() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_wav(dir.path(), "short.wav", 8000, 1, 16)?;
    let expected = AudioFile::open(&path)?.resampled(2_000_000).len();
    assert!(expected > 0);

    let config = CaptureConfig {
        sample_rate: 2_000_000,
        chunk_size: 1,
        channel_capacity: 64,
    };
    let mut capture = FileCapture::new(&path, config, false);
    let mut rx = capture.start().await?;

    let mut total = 0;
    while let Some(chunk) = rx.recv().await {
        assert_eq!(chunk.len(), 1);
        total += 1;
    }

    assert_eq!(total, expected);
    capture.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_file_capture_missing_file_fails_to_start() {
    let mut capture = CaptureFactory::create(
        CaptureKind::File {
            path: PathBuf::from("/nonexistent/capture.wav"),
            realtime: false,
        },
        CaptureConfig::default(),
    )
    .expect("file capture is always available");

    assert_eq!(capture.name(), "file");
    assert!(capture.start().await.is_err());
    assert!(!capture.is_capturing());
}

#[cfg(not(feature = "microphone"))]
#[test]
fn test_microphone_requires_feature() {
    let result = CaptureFactory::create(
        CaptureKind::Microphone { device: None },
        CaptureConfig::default(),
    );
    assert!(matches!(result, Err(CaptureError::Unsupported(_))));
}
