use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of "now" in milliseconds
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall clock (Unix epoch milliseconds)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Virtual clock advanced by hand; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// The delayed tasks the transport client schedules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    ConnectTimeout,
    Heartbeat,
    PongTimeout,
    HealthCheck,
    Reconnect,
}

/// Handle to one armed timer instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    pub kind: TimerKind,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    deadline_ms: u64,
    generation: u64,
}

/// Cancelable delayed tasks, at most one armed per [`TimerKind`]
///
/// Re-arming a kind replaces the previous instance. A token is only honoured
/// by [`consume`](Self::consume) while it is still the armed instance, so a
/// callback for a cancelled or replaced timer is a no-op.
#[derive(Debug, Default)]
pub struct TimerQueue {
    armed: HashMap<TimerKind, Armed>,
    next_generation: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, kind: TimerKind, now_ms: u64, delay_ms: u64) -> TimerToken {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.armed.insert(
            kind,
            Armed {
                deadline_ms: now_ms.saturating_add(delay_ms),
                generation,
            },
        );
        TimerToken { kind, generation }
    }

    /// Returns true if a timer of this kind was armed
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.armed.remove(&kind).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.armed.clear();
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed.contains_key(&kind)
    }

    pub fn deadline(&self, kind: TimerKind) -> Option<u64> {
        self.armed.get(&kind).map(|a| a.deadline_ms)
    }

    /// Token of the armed instance of `kind`, if any
    pub fn token(&self, kind: TimerKind) -> Option<TimerToken> {
        self.armed.get(&kind).map(|a| TimerToken {
            kind,
            generation: a.generation,
        })
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.armed.values().map(|a| a.deadline_ms).min()
    }

    /// Tokens whose deadline has passed, earliest first. Nothing is removed.
    pub fn due(&self, now_ms: u64) -> Vec<TimerToken> {
        let mut due: Vec<(u64, TimerToken)> = self
            .armed
            .iter()
            .filter(|(_, a)| a.deadline_ms <= now_ms)
            .map(|(kind, a)| {
                (
                    a.deadline_ms,
                    TimerToken {
                        kind: *kind,
                        generation: a.generation,
                    },
                )
            })
            .collect();
        due.sort_by_key(|(deadline, token)| (*deadline, token.generation));
        due.into_iter().map(|(_, token)| token).collect()
    }

    /// Disarm `token` if it is still current; false means it is stale
    pub fn consume(&mut self, token: TimerToken) -> bool {
        match self.armed.get(&token.kind) {
            Some(armed) if armed.generation == token.generation => {
                self.armed.remove(&token.kind);
                true
            }
            _ => false,
        }
    }
}
