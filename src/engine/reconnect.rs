use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Inputs to a backoff decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectContext {
    /// 1-based number of the attempt being scheduled
    pub attempt: u32,
    pub consecutive_failures: u32,
    pub health_score: u8,
    /// Milliseconds since the last successful connect, if there was one
    pub since_last_success_ms: Option<u64>,
}

/// Pluggable backoff strategy
pub trait ReconnectionPolicy: Send {
    /// Delay before the attempt described by `ctx`
    fn next_delay(&mut self, ctx: &ReconnectContext) -> Duration;

    /// Called after a successful connect
    fn on_success(&mut self) {}

    fn name(&self) -> &'static str;
}

/// Strategy selector used by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconnectStrategy {
    Fixed,
    Exponential,
    Adaptive,
}

/// Parameters shared by the built-in strategies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackoffSettings {
    pub base_delay_ms: u64,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Per-attempt growth of the adaptive multiplier
    pub adaptive_growth: f64,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            min_delay_ms: 1_000,
            max_delay_ms: 60_000,
            adaptive_growth: 1.2,
        }
    }
}

/// Build a boxed policy for `strategy`
pub fn build_policy(
    strategy: ReconnectStrategy,
    settings: BackoffSettings,
) -> Box<dyn ReconnectionPolicy> {
    match strategy {
        ReconnectStrategy::Fixed => Box::new(FixedPolicy::new(settings.base_delay_ms)),
        ReconnectStrategy::Exponential => Box::new(ExponentialPolicy::new(
            settings.base_delay_ms,
            settings.max_delay_ms,
        )),
        ReconnectStrategy::Adaptive => Box::new(AdaptivePolicy::new(settings)),
    }
}

/// Same delay for every attempt
#[derive(Debug, Clone)]
pub struct FixedPolicy {
    delay_ms: u64,
}

impl FixedPolicy {
    pub fn new(delay_ms: u64) -> Self {
        Self { delay_ms }
    }
}

impl ReconnectionPolicy for FixedPolicy {
    fn next_delay(&mut self, _ctx: &ReconnectContext) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// `base * 2^(attempt - 1)`, capped at `max`
#[derive(Debug, Clone)]
pub struct ExponentialPolicy {
    base_ms: u64,
    max_ms: u64,
}

impl ExponentialPolicy {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self { base_ms, max_ms }
    }
}

impl ReconnectionPolicy for ExponentialPolicy {
    fn next_delay(&mut self, ctx: &ReconnectContext) -> Duration {
        let exp = ctx.attempt.saturating_sub(1).min(20);
        let delay = self.base_ms.saturating_mul(1u64 << exp).min(self.max_ms);
        Duration::from_millis(delay)
    }

    fn name(&self) -> &'static str {
        "exponential"
    }
}

/// Window over which a past success still shortens the backoff
const STABILITY_WINDOW_MS: f64 = 300_000.0;

/// Backoff that reacts to failure streaks, connection history and health
///
/// `delay = clamp(base × failure × stability × health × adaptive, min, max)`
/// - failure = 1 + 0.5 × consecutive failures
/// - stability = max(0.5, 1 − elapsed since last success / 300 s)
/// - health = 1 + (100 − score) / 100
/// - adaptive grows by `adaptive_growth` per attempt, reset on success
#[derive(Debug, Clone)]
pub struct AdaptivePolicy {
    settings: BackoffSettings,
    adaptive_multiplier: f64,
}

impl AdaptivePolicy {
    pub fn new(settings: BackoffSettings) -> Self {
        Self {
            settings,
            adaptive_multiplier: 1.0,
        }
    }

    pub fn adaptive_multiplier(&self) -> f64 {
        self.adaptive_multiplier
    }

    /// Delay for `ctx` with the current multiplier, without advancing it
    pub fn compute(&self, ctx: &ReconnectContext) -> Duration {
        let failure = 1.0 + 0.5 * ctx.consecutive_failures as f64;
        let stability = match ctx.since_last_success_ms {
            Some(elapsed) => (1.0 - elapsed as f64 / STABILITY_WINDOW_MS).max(0.5),
            None => 1.0,
        };
        let health = 1.0 + (100.0 - ctx.health_score.min(100) as f64) / 100.0;

        let raw = self.settings.base_delay_ms as f64
            * failure
            * stability
            * health
            * self.adaptive_multiplier;

        let min = self.settings.min_delay_ms as f64;
        let max = (self.settings.max_delay_ms as f64).max(min);
        Duration::from_millis(raw.clamp(min, max).round() as u64)
    }
}

impl ReconnectionPolicy for AdaptivePolicy {
    fn next_delay(&mut self, ctx: &ReconnectContext) -> Duration {
        let delay = self.compute(ctx);
        self.adaptive_multiplier *= self.settings.adaptive_growth;
        delay
    }

    fn on_success(&mut self) {
        self.adaptive_multiplier = 1.0;
    }

    fn name(&self) -> &'static str {
        "adaptive"
    }
}
