use serde::{Deserialize, Serialize};
use tracing::debug;

use super::state::QualityTier;

/// Health score after a successful connect
pub const MAX_HEALTH_SCORE: u8 = 100;

/// Weight of the previous average in the latency EMA
pub const LATENCY_SMOOTHING: f64 = 0.8;

/// Default silence window before the score starts decaying
pub const DEFAULT_IDLE_THRESHOLD_MS: u64 = 60_000;

/// Events that move the health score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthEvent {
    HeartbeatSuccess,
    Idle,
    SendFailed,
    UnexpectedClose,
    HeartbeatTimeout,
}

impl HealthEvent {
    pub fn delta(self) -> i32 {
        match self {
            HealthEvent::HeartbeatSuccess => 2,
            HealthEvent::Idle => -5,
            HealthEvent::SendFailed => -10,
            HealthEvent::UnexpectedClose => -20,
            HealthEvent::HeartbeatTimeout => -25,
        }
    }
}

/// Read-only view of connection health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub quality_tier: QualityTier,
    pub health_score: u8,
    /// Smoothed round-trip latency, absent until the first pong
    pub average_latency_ms: Option<f64>,
    pub last_latency_ms: Option<f64>,
    pub missed_pongs: u32,
}

/// Heartbeat latency tracking and the 0–100 health score
#[derive(Debug)]
pub struct HealthMonitor {
    score: u8,
    average_latency_ms: Option<f64>,
    last_latency_ms: Option<f64>,
    ping_sent_at: Option<u64>,
    last_activity_ms: u64,
    missed_pongs: u32,
    idle_threshold_ms: u64,
    last_tier: QualityTier,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_THRESHOLD_MS)
    }
}

impl HealthMonitor {
    pub fn new(idle_threshold_ms: u64) -> Self {
        Self {
            score: MAX_HEALTH_SCORE,
            average_latency_ms: None,
            last_latency_ms: None,
            ping_sent_at: None,
            last_activity_ms: 0,
            missed_pongs: 0,
            idle_threshold_ms,
            last_tier: QualityTier::Disconnected,
        }
    }

    /// Fresh connection: full score, no latency history
    pub fn reset(&mut self, now_ms: u64) {
        self.score = MAX_HEALTH_SCORE;
        self.average_latency_ms = None;
        self.last_latency_ms = None;
        self.ping_sent_at = None;
        self.last_activity_ms = now_ms;
        self.missed_pongs = 0;
    }

    /// Note a ping; while one is unanswered the earliest send time is kept
    pub fn on_ping_sent(&mut self, now_ms: u64) {
        self.ping_sent_at.get_or_insert(now_ms);
    }

    /// Whether a ping is still waiting for its pong
    pub fn awaiting_pong(&self) -> bool {
        self.ping_sent_at.is_some()
    }

    /// Record a pong; returns the round-trip latency if a ping was outstanding
    pub fn on_pong(&mut self, now_ms: u64) -> Option<f64> {
        self.last_activity_ms = now_ms;
        let sent_at = self.ping_sent_at.take()?;

        let latency = now_ms.saturating_sub(sent_at) as f64;
        let average = match self.average_latency_ms {
            Some(previous) => LATENCY_SMOOTHING * previous + (1.0 - LATENCY_SMOOTHING) * latency,
            None => latency,
        };
        self.average_latency_ms = Some(average);
        self.last_latency_ms = Some(latency);
        self.apply(HealthEvent::HeartbeatSuccess);

        debug!("Pong received: {:.0}ms (avg {:.1}ms)", latency, average);
        Some(latency)
    }

    /// The outstanding ping timed out
    pub fn on_missed_pong(&mut self) {
        self.ping_sent_at = None;
        self.missed_pongs += 1;
        self.apply(HealthEvent::HeartbeatTimeout);
    }

    /// Any inbound frame counts as proof of life
    pub fn record_activity(&mut self, now_ms: u64) {
        self.last_activity_ms = now_ms;
    }

    /// Apply the idle penalty if nothing was heard for the idle threshold
    pub fn check_idle(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.last_activity_ms) >= self.idle_threshold_ms {
            self.apply(HealthEvent::Idle);
            true
        } else {
            false
        }
    }

    pub fn apply(&mut self, event: HealthEvent) -> u8 {
        self.score(event.delta())
    }

    /// Nudge the score by `delta`, clamped to [0, 100]
    pub fn score(&mut self, delta: i32) -> u8 {
        let next = (self.score as i32 + delta).clamp(0, MAX_HEALTH_SCORE as i32);
        self.score = next as u8;
        self.score
    }

    pub fn health_score(&self) -> u8 {
        self.score
    }

    pub fn average_latency_ms(&self) -> Option<f64> {
        self.average_latency_ms
    }

    /// Tier for a latency/score pair; first matching rule wins
    pub fn tier_for(average_latency_ms: f64, health_score: u8) -> QualityTier {
        if average_latency_ms < 100.0 && health_score > 80 {
            QualityTier::Excellent
        } else if average_latency_ms < 200.0 && health_score > 60 {
            QualityTier::Good
        } else if average_latency_ms < 500.0 && health_score > 40 {
            QualityTier::Fair
        } else {
            QualityTier::Poor
        }
    }

    pub fn current_tier(&self, connected: bool) -> QualityTier {
        if !connected {
            return QualityTier::Disconnected;
        }
        match self.average_latency_ms {
            Some(latency) => Self::tier_for(latency, self.score),
            None if self.score <= 40 => QualityTier::Poor,
            None => QualityTier::Unknown,
        }
    }

    /// Recompute the tier; `Some` only when it changed since the last call
    pub fn update_tier(&mut self, connected: bool) -> Option<QualityTier> {
        let tier = self.current_tier(connected);
        if tier == self.last_tier {
            return None;
        }
        self.last_tier = tier;
        Some(tier)
    }

    pub fn snapshot(&self, connected: bool) -> HealthSnapshot {
        HealthSnapshot {
            quality_tier: self.current_tier(connected),
            health_score: self.score,
            average_latency_ms: self.average_latency_ms,
            last_latency_ms: self.last_latency_ms,
            missed_pongs: self.missed_pongs,
        }
    }
}
