//! Connection engine
//!
//! [`TransportClient`] is a single-owner state machine: connection lifecycle,
//! session binding, heartbeat and health, the bounded outbound queue and the
//! reconnect schedule all live here. It performs no I/O of its own; sockets
//! come in through [`Transport`](crate::transport::Transport), time through
//! [`Clock`], and everything it reports goes out through an
//! [`EngineObserver`].

mod client;
mod health;
mod observer;
mod queue;
mod reconnect;
mod session;
mod state;
mod timers;

pub use client::{ClientConfig, ClientEvent, ClientSnapshot, Delivery, StopOutcome, TransportClient};
pub use health::{
    HealthEvent, HealthMonitor, HealthSnapshot, DEFAULT_IDLE_THRESHOLD_MS, LATENCY_SMOOTHING,
    MAX_HEALTH_SCORE,
};
pub use observer::{ChannelObserver, EngineObserver, Notification, NullObserver, RecordingObserver};
pub use queue::{DrainReport, MessageQueue, MessageSink, DEFAULT_MAX_QUEUE_SIZE};
pub use reconnect::{
    build_policy, AdaptivePolicy, BackoffSettings, ExponentialPolicy, FixedPolicy,
    ReconnectContext, ReconnectStrategy, ReconnectionPolicy,
};
pub use session::{ClientStats, Session};
pub use state::{ConnectionState, QualityTier};
pub use timers::{Clock, ManualClock, SystemClock, TimerKind, TimerQueue, TimerToken};
