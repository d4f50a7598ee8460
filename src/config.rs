use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::engine::{BackoffSettings, ClientConfig, ReconnectStrategy};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub transport: TransportConfig,
    pub heartbeat: HeartbeatConfig,
    pub reconnect: ReconnectConfig,
    pub queue: QueueConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "soundditect-stream".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "127.0.0.1".to_string(),
            port: 8090,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub window_duration_ms: u64,
    /// Samples per capture chunk
    pub chunk_size: usize,
    pub quietness_floor: f32,
    pub headroom: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            window_duration_ms: 1000,
            chunk_size: 1024,
            quietness_floor: crate::audio::preprocess::DEFAULT_QUIETNESS_FLOOR,
            headroom: crate::audio::preprocess::DEFAULT_HEADROOM,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub url: String,
    pub connect_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000/ws/audio".to_string(),
            connect_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub interval_ms: u64,
    pub pong_timeout_base_ms: u64,
    pub pong_timeout_step_ms: u64,
    pub pong_timeout_max_ms: u64,
    pub health_check_interval_ms: u64,
    pub idle_threshold_ms: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_ms: 15_000,
            pong_timeout_base_ms: 15_000,
            pong_timeout_step_ms: 2_000,
            pong_timeout_max_ms: 30_000,
            health_check_interval_ms: 30_000,
            idle_threshold_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub strategy: ReconnectStrategy,
    pub base_delay_ms: u64,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
    pub adaptive_growth: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        let backoff = BackoffSettings::default();
        Self {
            strategy: ReconnectStrategy::Adaptive,
            base_delay_ms: backoff.base_delay_ms,
            min_delay_ms: backoff.min_delay_ms,
            max_delay_ms: backoff.max_delay_ms,
            max_attempts: 15,
            adaptive_growth: backoff.adaptive_growth,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub max_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_size: crate::engine::DEFAULT_MAX_QUEUE_SIZE,
        }
    }
}

impl Config {
    /// Load `path` (optional, any format the config crate knows) under
    /// `SOUNDDITECT__*` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("SOUNDDITECT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path))?;

        let cfg: Config = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            bail!("audio.sample_rate must be positive");
        }
        if self.audio.window_duration_ms == 0 {
            bail!("audio.window_duration_ms must be positive");
        }
        if self.audio.chunk_size == 0 {
            bail!("audio.chunk_size must be positive");
        }
        if !(self.audio.headroom > 0.0 && self.audio.headroom <= 1.0) {
            bail!("audio.headroom must be in (0, 1], got {}", self.audio.headroom);
        }
        if self.queue.max_size == 0 {
            bail!("queue.max_size must be positive");
        }
        if self.reconnect.min_delay_ms > self.reconnect.max_delay_ms {
            bail!(
                "reconnect.min_delay_ms ({}) exceeds reconnect.max_delay_ms ({})",
                self.reconnect.min_delay_ms,
                self.reconnect.max_delay_ms
            );
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            url: self.transport.url.clone(),
            connect_timeout_ms: self.transport.connect_timeout_ms,
            heartbeat_interval_ms: self.heartbeat.interval_ms,
            pong_timeout_base_ms: self.heartbeat.pong_timeout_base_ms,
            pong_timeout_step_ms: self.heartbeat.pong_timeout_step_ms,
            pong_timeout_max_ms: self.heartbeat.pong_timeout_max_ms,
            health_check_interval_ms: self.heartbeat.health_check_interval_ms,
            idle_threshold_ms: self.heartbeat.idle_threshold_ms,
            max_reconnect_attempts: self.reconnect.max_attempts,
            max_queue_size: self.queue.max_size,
        }
    }

    pub fn backoff_settings(&self) -> BackoffSettings {
        BackoffSettings {
            base_delay_ms: self.reconnect.base_delay_ms,
            min_delay_ms: self.reconnect.min_delay_ms,
            max_delay_ms: self.reconnect.max_delay_ms,
            adaptive_growth: self.reconnect.adaptive_growth,
        }
    }

    pub fn capture_config(&self) -> crate::audio::CaptureConfig {
        crate::audio::CaptureConfig {
            sample_rate: self.audio.sample_rate,
            chunk_size: self.audio.chunk_size,
            ..Default::default()
        }
    }
}
