use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::health::{HealthEvent, HealthMonitor, HealthSnapshot, DEFAULT_IDLE_THRESHOLD_MS};
use super::observer::{EngineObserver, Notification};
use super::queue::{MessageQueue, MessageSink, DEFAULT_MAX_QUEUE_SIZE};
use super::reconnect::{ReconnectContext, ReconnectionPolicy};
use super::session::{ClientStats, Session};
use super::state::ConnectionState;
use super::timers::{Clock, TimerKind, TimerQueue, TimerToken};
use crate::error::{EngineError, TransportError};
use crate::protocol::close::{
    close_reason, should_reconnect, CONNECT_TIMEOUT, HEARTBEAT_TIMEOUT, NORMAL_CLOSURE,
    TRANSPORT_FAILURE,
};
use crate::protocol::{EncodedPayload, ProtocolMessage};
use crate::transport::{ConnectionId, Transport, TransportEvent};

/// Tunables for the transport client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Inference service endpoint
    pub url: String,
    pub connect_timeout_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub pong_timeout_base_ms: u64,
    /// Added to the pong timeout per consecutive missed pong
    pub pong_timeout_step_ms: u64,
    pub pong_timeout_max_ms: u64,
    pub health_check_interval_ms: u64,
    pub idle_threshold_ms: u64,
    pub max_reconnect_attempts: u32,
    pub max_queue_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000/ws/audio".to_string(),
            connect_timeout_ms: 10_000,
            heartbeat_interval_ms: 15_000,
            pong_timeout_base_ms: 15_000,
            pong_timeout_step_ms: 2_000,
            pong_timeout_max_ms: 30_000,
            health_check_interval_ms: 30_000,
            idle_threshold_ms: DEFAULT_IDLE_THRESHOLD_MS,
            max_reconnect_attempts: 15,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
        }
    }
}

/// Inputs to the connection state machine
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Caller asked to connect
    Connect,
    /// Caller asked to reconnect now, even from `Failed`
    ForceReconnect,
    /// Caller asked to close normally
    Disconnect,
    Transport(TransportEvent),
    Timer(TimerToken),
}

/// How an outbound message was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Queued,
}

/// Result of `stop_recording`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StopOutcome {
    AlreadyStopped,
    Stopped {
        session_id: String,
        /// Whether `stop_recording` reached the transport
        delivered: bool,
    },
}

/// Read-only view of the client for observers and the status API
#[derive(Debug, Clone, Serialize)]
pub struct ClientSnapshot {
    pub state: ConnectionState,
    pub session: Option<Session>,
    pub health: HealthSnapshot,
    pub client_id: Option<String>,
    pub connection: ConnectionId,
    pub queue_len: usize,
    pub queue_capacity: usize,
    pub reconnect_attempts: u32,
    pub max_reconnect_attempts: u32,
    pub consecutive_failures: u32,
    pub reconnect_policy: &'static str,
    pub stats: ClientStats,
}

enum Failure {
    Closed,
    TransportError(String),
    ConnectTimeout,
    HeartbeatTimeout,
}

struct TransportSink<'a> {
    transport: &'a mut dyn Transport,
    sent: u64,
}

impl MessageSink for TransportSink<'_> {
    fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    fn send(&mut self, message: &ProtocolMessage) -> Result<(), TransportError> {
        let frame = message
            .encode()
            .map_err(|e| TransportError::Send(e.to_string()))?;
        self.transport.send(frame)?;
        self.sent += 1;
        Ok(())
    }
}

/// Session-oriented client for the inference service
///
/// Owns the connection state machine: every input goes through
/// [`handle`](Self::handle) (or one of the command methods) on a single event
/// loop. Timers live in a [`TimerQueue`] driven by the injected [`Clock`], so
/// the client never sleeps and tests can run on virtual time.
pub struct TransportClient {
    config: ClientConfig,
    transport: Box<dyn Transport>,
    clock: Arc<dyn Clock>,
    policy: Box<dyn ReconnectionPolicy>,
    observer: Box<dyn EngineObserver>,
    timers: TimerQueue,
    queue: MessageQueue,
    health: HealthMonitor,
    state: ConnectionState,
    connection: ConnectionId,
    session: Option<Session>,
    client_id: Option<String>,
    attempts: u32,
    consecutive_failures: u32,
    heartbeat_failures: u32,
    last_success_ms: Option<u64>,
    stats: ClientStats,
    pending: Vec<Notification>,
}

impl TransportClient {
    pub fn new(
        config: ClientConfig,
        transport: Box<dyn Transport>,
        clock: Arc<dyn Clock>,
        policy: Box<dyn ReconnectionPolicy>,
        observer: Box<dyn EngineObserver>,
    ) -> Self {
        let queue = MessageQueue::new(config.max_queue_size);
        let health = HealthMonitor::new(config.idle_threshold_ms);

        Self {
            config,
            transport,
            clock,
            policy,
            observer,
            timers: TimerQueue::new(),
            queue,
            health,
            state: ConnectionState::Disconnected,
            connection: 0,
            session: None,
            client_id: None,
            attempts: 0,
            consecutive_failures: 0,
            heartbeat_failures: 0,
            last_success_ms: None,
            stats: ClientStats::default(),
            pending: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // State machine
    // ------------------------------------------------------------------

    /// Apply one event, then deliver the notifications it produced
    pub fn handle(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Connect => self.on_connect_requested(),
            ClientEvent::ForceReconnect => self.on_force_reconnect(),
            ClientEvent::Disconnect => self.on_disconnect_requested(),
            ClientEvent::Transport(event) => self.on_transport_event(event),
            ClientEvent::Timer(token) => {
                self.on_timer(token);
            }
        }
        self.flush();
    }

    pub fn connect(&mut self) {
        self.handle(ClientEvent::Connect);
    }

    /// Manual recovery, also out of `Failed`
    pub fn force_reconnect(&mut self) {
        self.handle(ClientEvent::ForceReconnect);
    }

    pub fn disconnect(&mut self) {
        self.handle(ClientEvent::Disconnect);
    }

    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        self.handle(ClientEvent::Transport(event));
    }

    pub fn fire_timer(&mut self, token: TimerToken) {
        self.handle(ClientEvent::Timer(token));
    }

    /// Fire every timer that is due on the client's clock
    pub fn poll_timers(&mut self) -> usize {
        let now = self.clock.now_ms();
        let mut fired = 0;
        for token in self.timers.due(now) {
            if self.on_timer(token) {
                fired += 1;
            }
        }
        self.flush();
        fired
    }

    /// Earliest armed timer deadline (clock milliseconds)
    pub fn next_timer_deadline(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    fn on_connect_requested(&mut self) {
        match self.state {
            ConnectionState::Connected | ConnectionState::Connecting => {
                debug!("Connect ignored: already {}", self.state);
            }
            ConnectionState::Failed => {
                warn!("Connect ignored: reconnect attempts exhausted, a forced reconnect is required");
            }
            _ => {
                self.timers.cancel(TimerKind::Reconnect);
                self.open_connection();
            }
        }
    }

    fn on_force_reconnect(&mut self) {
        // Halved, not reset
        self.attempts /= 2;
        self.consecutive_failures /= 2;
        info!(
            "Forced reconnect (attempts relaxed to {}, failures to {})",
            self.attempts, self.consecutive_failures
        );

        self.timers.cancel(TimerKind::Reconnect);
        let was_connected = self.state == ConnectionState::Connected;
        if was_connected {
            self.stop_recording_inner();
        }
        if self.state.is_active() {
            self.transport.close(NORMAL_CLOSURE, "forced reconnect");
            self.teardown_connection();
        }
        if was_connected {
            self.pending.push(Notification::Disconnected {
                code: NORMAL_CLOSURE,
                reason: "forced reconnect".to_string(),
            });
        }
        self.open_connection();
    }

    fn on_disconnect_requested(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }

        let was_connected = self.state == ConnectionState::Connected;
        if was_connected {
            self.stop_recording_inner();
        }

        self.timers.cancel_all();
        if self.state.is_active() {
            self.transport.close(NORMAL_CLOSURE, "client disconnect");
        }
        self.teardown_connection();
        self.set_state(ConnectionState::Disconnected);

        if was_connected {
            self.pending.push(Notification::Disconnected {
                code: NORMAL_CLOSURE,
                reason: "client disconnect".to_string(),
            });
        }
        info!("Disconnected by client");
    }

    fn open_connection(&mut self) {
        self.connection += 1;
        let conn = self.connection;
        self.set_state(ConnectionState::Connecting);

        info!(
            "Connecting to {} (connection {}, attempt {}/{})",
            self.config.url, conn, self.attempts, self.config.max_reconnect_attempts
        );

        match self.transport.open(conn, &self.config.url) {
            Ok(()) => {
                let now = self.clock.now_ms();
                self.timers
                    .arm(TimerKind::ConnectTimeout, now, self.config.connect_timeout_ms);
            }
            Err(e) => {
                warn!("Failed to open connection {}: {}", conn, e);
                self.handle_failure(Failure::TransportError(e.to_string()));
            }
        }
    }

    fn on_transport_event(&mut self, event: TransportEvent) {
        if event.conn() != self.connection || !self.state.is_active() {
            debug!(
                "Ignoring event from connection {} (current {}, state {})",
                event.conn(),
                self.connection,
                self.state
            );
            return;
        }

        match event {
            TransportEvent::Opened { .. } => {
                if self.state == ConnectionState::Connecting {
                    self.on_opened();
                }
            }
            TransportEvent::Message { text, .. } => {
                if self.state == ConnectionState::Connected {
                    self.on_message(&text);
                }
            }
            TransportEvent::Closed { code, reason, .. } => self.on_closed(code, reason),
            TransportEvent::Error { message, .. } => {
                warn!("Transport error on connection {}: {}", self.connection, message);
                self.transport.close(TRANSPORT_FAILURE, "transport error");
                self.handle_failure(Failure::TransportError(message));
            }
        }
    }

    fn on_opened(&mut self) {
        let now = self.clock.now_ms();
        self.timers.cancel(TimerKind::ConnectTimeout);

        self.attempts = 0;
        self.consecutive_failures = 0;
        self.last_success_ms = Some(now);
        self.policy.on_success();
        self.health.reset(now);

        self.set_state(ConnectionState::Connected);
        self.pending.push(Notification::Connected);
        info!("Connected to {} (connection {})", self.config.url, self.connection);

        self.timers
            .arm(TimerKind::Heartbeat, now, self.config.heartbeat_interval_ms);
        self.timers
            .arm(TimerKind::HealthCheck, now, self.config.health_check_interval_ms);

        if !self.queue.is_empty() {
            self.drain_queue();
        }
    }

    fn on_closed(&mut self, code: u16, reason: String) {
        let reason = if reason.is_empty() {
            close_reason(code).to_string()
        } else {
            reason
        };
        info!("Connection {} closed: {} ({})", self.connection, code, reason);

        let was_connected = self.state == ConnectionState::Connected;
        if was_connected {
            self.pending.push(Notification::Disconnected {
                code,
                reason: reason.clone(),
            });
        }

        if should_reconnect(code) {
            self.handle_failure(Failure::Closed);
        } else {
            self.teardown_connection();
            self.set_state(ConnectionState::Disconnected);
        }
    }

    fn on_message(&mut self, text: &str) {
        let now = self.clock.now_ms();
        self.health.record_activity(now);

        let message = match ProtocolMessage::decode(text) {
            Ok(message) => message,
            Err(e) => {
                self.stats.protocol_errors += 1;
                warn!("Dropping malformed server message: {}", e);
                return;
            }
        };

        match message {
            ProtocolMessage::ConnectionEstablished { client_id, .. } => {
                info!("Server assigned client id {}", client_id);
                self.client_id = Some(client_id);
            }
            ProtocolMessage::Pong { .. } => {
                self.timers.cancel(TimerKind::PongTimeout);
                if self.health.on_pong(now).is_some() {
                    self.heartbeat_failures = 0;
                }
                self.refresh_quality();
            }
            ProtocolMessage::Ping { .. } => {
                let pong = ProtocolMessage::Pong {
                    timestamp: Some(now as f64),
                };
                if let Err(e) = self.transmit(&pong) {
                    debug!("Pong reply not sent: {}", e);
                }
            }
            ProtocolMessage::DetectionResult(result) => {
                self.stats.results_received += 1;
                if result.is_anomaly() {
                    self.stats.anomalies_detected += 1;
                }

                let current = self.session.as_ref().map(|s| s.session_id.as_str());
                if let (Some(tagged), Some(active)) = (result.session_id.as_deref(), current) {
                    if tagged != active {
                        debug!("Result for previous session {} delivered anyway", tagged);
                    }
                }

                debug!(
                    "Detection result: prediction={} confidence={:.3} status={}",
                    result.prediction, result.confidence, result.status
                );
                self.pending.push(Notification::DetectionResult(result));
            }
            ProtocolMessage::RecordingStarted { session_id, .. } => {
                match (&mut self.session, session_id) {
                    (Some(session), Some(id)) if session.session_id == id => {
                        session.acknowledged = true;
                        debug!("Server acknowledged session {}", id);
                    }
                    (_, id) => debug!("Ignoring recording_started for {:?}", id),
                }
            }
            ProtocolMessage::RecordingStopped { session_id, .. } => {
                debug!("Server stopped session {:?}", session_id);
            }
            ProtocolMessage::Error { message, .. } => {
                warn!("Server error: {}", message);
                self.pending.push(Notification::Error(message));
            }
            other @ (ProtocolMessage::StartRecording { .. }
            | ProtocolMessage::StopRecording { .. }
            | ProtocolMessage::AudioData { .. }) => {
                self.stats.protocol_errors += 1;
                warn!("Dropping unexpected {} frame from server", other.kind());
            }
        }
    }

    /// Returns false for stale tokens
    fn on_timer(&mut self, token: TimerToken) -> bool {
        if !self.timers.consume(token) {
            debug!("Ignoring stale {:?} timer", token.kind);
            return false;
        }

        let now = self.clock.now_ms();
        match token.kind {
            TimerKind::ConnectTimeout => {
                if self.state == ConnectionState::Connecting {
                    warn!(
                        "Connection {} not established within {}ms",
                        self.connection, self.config.connect_timeout_ms
                    );
                    self.transport.close(CONNECT_TIMEOUT, "connection timeout");
                    self.handle_failure(Failure::ConnectTimeout);
                }
            }
            TimerKind::Heartbeat => {
                if self.state == ConnectionState::Connected {
                    self.send_heartbeat(now);
                    self.timers
                        .arm(TimerKind::Heartbeat, now, self.config.heartbeat_interval_ms);
                }
            }
            TimerKind::PongTimeout => {
                if self.state == ConnectionState::Connected {
                    warn!("Heartbeat timed out on connection {}", self.connection);
                    self.heartbeat_failures += 1;
                    self.health.on_missed_pong();
                    self.transport.close(HEARTBEAT_TIMEOUT, "heartbeat timeout");
                    self.handle_failure(Failure::HeartbeatTimeout);
                }
            }
            TimerKind::HealthCheck => {
                if self.state == ConnectionState::Connected {
                    if self.health.check_idle(now) {
                        warn!(
                            "No heartbeat activity for {}ms (score {})",
                            self.config.idle_threshold_ms,
                            self.health.health_score()
                        );
                    }
                    self.refresh_quality();
                    self.timers.arm(
                        TimerKind::HealthCheck,
                        now,
                        self.config.health_check_interval_ms,
                    );
                }
            }
            TimerKind::Reconnect => {
                if self.state == ConnectionState::Reconnecting
                    && self.attempts <= self.config.max_reconnect_attempts
                {
                    self.open_connection();
                }
            }
        }
        true
    }

    fn send_heartbeat(&mut self, now: u64) {
        let ping = ProtocolMessage::Ping {
            timestamp: Some(now as f64),
        };

        match self.transmit(&ping) {
            Ok(()) => {
                self.health.on_ping_sent(now);
                if !self.timers.is_armed(TimerKind::PongTimeout) {
                    let timeout = self.pong_timeout_ms();
                    self.timers.arm(TimerKind::PongTimeout, now, timeout);
                }
                debug!("Ping sent on connection {}", self.connection);
            }
            Err(e) => {
                warn!("Heartbeat send failed: {}", e);
                self.health.apply(HealthEvent::SendFailed);
                self.refresh_quality();
            }
        }
    }

    /// Base timeout stretched by recent missed pongs, capped
    pub fn pong_timeout_ms(&self) -> u64 {
        let stretched = self.config.pong_timeout_base_ms
            + self.config.pong_timeout_step_ms * self.heartbeat_failures as u64;
        stretched.min(self.config.pong_timeout_max_ms)
    }

    fn handle_failure(&mut self, failure: Failure) {
        self.teardown_connection();
        self.consecutive_failures += 1;

        match failure {
            Failure::Closed => {
                self.health.apply(HealthEvent::UnexpectedClose);
            }
            Failure::TransportError(message) => {
                self.health.apply(HealthEvent::SendFailed);
                self.set_state(ConnectionState::Error);
                debug!("Routing transport error into reconnect: {}", message);
            }
            Failure::ConnectTimeout => {
                self.health.apply(HealthEvent::UnexpectedClose);
                self.set_state(ConnectionState::Error);
            }
            Failure::HeartbeatTimeout => {
                // Penalty already applied by the missed pong
                self.set_state(ConnectionState::Error);
            }
        }

        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        let max = self.config.max_reconnect_attempts;
        if self.attempts >= max {
            error!("Giving up after {} reconnect attempts", self.attempts);
            self.timers.cancel(TimerKind::Reconnect);
            self.set_state(ConnectionState::Failed);
            self.pending.push(Notification::Error(format!(
                "Connection failed after {} reconnect attempts; reconnect manually",
                self.attempts
            )));
            return;
        }

        self.attempts += 1;
        let now = self.clock.now_ms();
        let ctx = ReconnectContext {
            attempt: self.attempts,
            consecutive_failures: self.consecutive_failures,
            health_score: self.health.health_score(),
            since_last_success_ms: self.last_success_ms.map(|t| now.saturating_sub(t)),
        };
        let delay_ms = self.policy.next_delay(&ctx).as_millis() as u64;

        self.timers.arm(TimerKind::Reconnect, now, delay_ms);
        self.set_state(ConnectionState::Reconnecting);

        info!(
            "Reconnecting in {}ms (attempt {}/{}, {} policy, {} consecutive failures)",
            delay_ms,
            self.attempts,
            max,
            self.policy.name(),
            self.consecutive_failures
        );
    }

    /// Forget everything bound to the current connection
    fn teardown_connection(&mut self) {
        self.timers.cancel(TimerKind::ConnectTimeout);
        self.timers.cancel(TimerKind::Heartbeat);
        self.timers.cancel(TimerKind::PongTimeout);
        self.timers.cancel(TimerKind::HealthCheck);
        self.client_id = None;

        if let Some(session) = self.end_session() {
            info!(
                "Session {} cleared with connection {}",
                session.session_id, self.connection
            );
        }
    }

    fn end_session(&mut self) -> Option<Session> {
        let session = self.session.take()?;
        let purged = self
            .queue
            .retain(|m| m.session_id() != Some(session.session_id.as_str()));
        if purged > 0 {
            self.stats.messages_purged += purged as u64;
            debug!(
                "Purged {} queued messages of session {}",
                purged, session.session_id
            );
        }
        Some(session)
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            debug!("Connection state: {} -> {}", self.state, state);
            self.state = state;
            self.pending.push(Notification::ConnectionStateChanged(state));
        }
        self.refresh_quality();
    }

    fn refresh_quality(&mut self) {
        let connected = self.state == ConnectionState::Connected;
        if let Some(tier) = self.health.update_tier(connected) {
            info!(
                "Connection quality: {} (score {})",
                tier,
                self.health.health_score()
            );
            self.pending.push(Notification::ConnectionQualityChanged {
                tier,
                score: self.health.health_score(),
            });
        }
    }

    fn flush(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for notification in &pending {
            self.observer.notify(notification);
        }
    }

    // ------------------------------------------------------------------
    // Outbound messages
    // ------------------------------------------------------------------

    fn transmit(&mut self, message: &ProtocolMessage) -> Result<(), EngineError> {
        if !self.transport.is_open() {
            return Err(TransportError::NotOpen.into());
        }
        let frame = message.encode()?;
        self.transport.send(frame)?;
        self.stats.messages_sent += 1;
        Ok(())
    }

    fn drain_queue(&mut self) {
        let mut sink = TransportSink {
            transport: self.transport.as_mut(),
            sent: 0,
        };
        let report = self.queue.drain_to(&mut sink);
        self.stats.messages_sent += sink.sent;

        if report.failed.is_some() {
            self.health.apply(HealthEvent::SendFailed);
            self.refresh_quality();
        }
    }

    /// Send now if possible, otherwise park in the bounded queue
    ///
    /// FIFO order is kept: while older messages are queued, new ones queue
    /// behind them.
    pub fn send_message(&mut self, message: ProtocolMessage) -> Delivery {
        let delivery = self.send_or_queue(message);
        self.flush();
        delivery
    }

    fn send_or_queue(&mut self, message: ProtocolMessage) -> Delivery {
        if self.state == ConnectionState::Connected && self.transport.is_open() {
            if !self.queue.is_empty() {
                self.drain_queue();
            }
            if self.queue.is_empty() {
                match self.transmit(&message) {
                    Ok(()) => return Delivery::Sent,
                    Err(e) => {
                        warn!("Send of {} failed, queueing: {}", message.kind(), e);
                        self.health.apply(HealthEvent::SendFailed);
                        self.refresh_quality();
                    }
                }
            }
        }

        self.stats.messages_queued += 1;
        if self.queue.enqueue(message).is_some() {
            self.stats.messages_dropped += 1;
        }
        Delivery::Queued
    }

    /// Open a new session on the server
    ///
    /// Local state only records the session after `start_recording` was
    /// handed to the transport; a failed send leaves no session behind.
    pub fn start_recording(&mut self) -> Result<String, EngineError> {
        if self.state != ConnectionState::Connected {
            return Err(EngineError::NotConnected { state: self.state });
        }
        if let Some(session) = &self.session {
            return Err(EngineError::AlreadyRecording {
                session_id: session.session_id.clone(),
            });
        }

        let now = self.clock.now_ms();
        let session = Session::new(self.connection, now);
        let start = ProtocolMessage::StartRecording {
            session_id: session.session_id.clone(),
            timestamp: now,
        };

        let result = match self.transmit(&start) {
            Ok(()) => {
                info!("Recording started: {}", session.session_id);
                let session_id = session.session_id.clone();
                self.session = Some(session);
                self.stats.sessions_started += 1;
                Ok(session_id)
            }
            Err(e) => {
                warn!("start_recording not sent, session discarded: {}", e);
                self.health.apply(HealthEvent::SendFailed);
                self.refresh_quality();
                Err(e)
            }
        };

        self.flush();
        result
    }

    /// End the active session; a no-op when none is active
    ///
    /// Local state is cleared whether or not the server hears about it.
    pub fn stop_recording(&mut self) -> StopOutcome {
        let outcome = self.stop_recording_inner();
        self.flush();
        outcome
    }

    fn stop_recording_inner(&mut self) -> StopOutcome {
        // Windows already accepted for this session go out ahead of the stop
        if self.session.is_some()
            && self.state == ConnectionState::Connected
            && !self.queue.is_empty()
        {
            self.drain_queue();
        }

        let Some(session) = self.end_session() else {
            debug!("stop_recording: already stopped");
            return StopOutcome::AlreadyStopped;
        };

        let stop = ProtocolMessage::StopRecording {
            session_id: session.session_id.clone(),
            timestamp: self.clock.now_ms(),
        };
        let delivered = match self.transmit(&stop) {
            Ok(()) => true,
            Err(e) => {
                debug!("stop_recording not delivered: {}", e);
                false
            }
        };

        info!(
            "Recording stopped: {} (server notified: {})",
            session.session_id, delivered
        );
        StopOutcome::Stopped {
            session_id: session.session_id,
            delivered,
        }
    }

    /// Ship one encoded window for the active session
    ///
    /// Rejected without side effects unless connected with an active session.
    pub fn send_audio_data(&mut self, payload: EncodedPayload) -> Result<Delivery, EngineError> {
        if self.state != ConnectionState::Connected {
            return Err(EngineError::NotConnected { state: self.state });
        }
        let session_id = self
            .session
            .as_ref()
            .map(|s| s.session_id.clone())
            .ok_or(EngineError::NoActiveSession)?;

        let message = ProtocolMessage::AudioData {
            data: payload.data,
            sample_rate: payload.sample_rate,
            session_id,
            timestamp: self.clock.now_ms(),
            data_size: payload.sample_count,
        };

        self.stats.windows_sent += 1;
        let delivery = self.send_or_queue(message);
        self.flush();
        Ok(delivery)
    }

    // ------------------------------------------------------------------
    // Read-only accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection
    }

    pub fn health(&self) -> HealthSnapshot {
        self.health
            .snapshot(self.state == ConnectionState::Connected)
    }

    pub fn queue(&self) -> &MessageQueue {
        &self.queue
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn stats(&self) -> &ClientStats {
        &self.stats
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn snapshot(&self) -> ClientSnapshot {
        ClientSnapshot {
            state: self.state,
            session: self.session.clone(),
            health: self.health(),
            client_id: self.client_id.clone(),
            connection: self.connection,
            queue_len: self.queue.len(),
            queue_capacity: self.queue.capacity(),
            reconnect_attempts: self.attempts,
            max_reconnect_attempts: self.config.max_reconnect_attempts,
            consecutive_failures: self.consecutive_failures,
            reconnect_policy: self.policy.name(),
            stats: self.stats.clone(),
        }
    }
}
