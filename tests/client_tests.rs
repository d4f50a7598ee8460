// Integration tests for the transport client state machine
//
// Everything runs on virtual time: a ManualClock drives the timer queue, the
// MockTransport records outbound frames, and connection events are fed by hand.

use soundditect_stream::engine::{
    AdaptivePolicy, BackoffSettings, ClientConfig, Clock, ConnectionState, Delivery, FixedPolicy,
    ManualClock, Notification, QualityTier, RecordingObserver, ReconnectionPolicy, StopOutcome,
    TimerKind, TransportClient,
};
use soundditect_stream::protocol::close::{
    ABNORMAL_CLOSURE, CONNECT_TIMEOUT, HEARTBEAT_TIMEOUT, NORMAL_CLOSURE, TRANSPORT_FAILURE,
};
use soundditect_stream::protocol::{EncodedPayload, ProtocolMessage};
use soundditect_stream::transport::{MockTransport, MockTransportHandle, TransportEvent};
use soundditect_stream::EngineError;
use std::sync::Arc;

const START_MS: u64 = 1_000_000;

struct Harness {
    client: TransportClient,
    transport: MockTransportHandle,
    clock: ManualClock,
    observer: RecordingObserver,
}

impl Harness {
    fn new() -> Self {
        Self::with(
            ClientConfig::default(),
            Box::new(AdaptivePolicy::new(BackoffSettings::default())),
        )
    }

    fn with(config: ClientConfig, policy: Box<dyn ReconnectionPolicy>) -> Self {
        let (transport, handle) = MockTransport::new();
        let clock = ManualClock::new(START_MS);
        let observer = RecordingObserver::new();
        let client = TransportClient::new(
            config,
            Box::new(transport),
            Arc::new(clock.clone()),
            policy,
            Box::new(observer.clone()),
        );

        Self {
            client,
            transport: handle,
            clock,
            observer,
        }
    }

    /// Deliver `Opened` for the connection currently being opened
    fn open(&mut self) {
        self.transport.set_open(true);
        let conn = self.client.connection_id();
        self.client
            .handle_transport_event(TransportEvent::Opened { conn });
    }

    fn connect(&mut self) {
        self.client.connect();
        self.open();
    }

    fn close(&mut self, code: u16) {
        self.transport.set_open(false);
        let conn = self.client.connection_id();
        self.client.handle_transport_event(TransportEvent::Closed {
            conn,
            code,
            reason: String::new(),
        });
    }

    fn server_says(&mut self, json: &str) {
        let conn = self.client.connection_id();
        self.client.handle_transport_event(TransportEvent::Message {
            conn,
            text: json.to_string(),
        });
    }

    fn advance(&mut self, ms: u64) -> usize {
        self.clock.advance(ms);
        self.client.poll_timers()
    }

    /// Jump to the armed timer of `kind` and fire everything due
    fn fire(&mut self, kind: TimerKind) {
        let deadline = self
            .client
            .timers()
            .deadline(kind)
            .unwrap_or_else(|| panic!("{:?} timer should be armed", kind));
        self.clock.set(deadline.max(self.clock.now_ms()));
        self.client.poll_timers();
    }

    fn reconnect_delay(&self) -> u64 {
        self.client
            .timers()
            .deadline(TimerKind::Reconnect)
            .expect("reconnect should be scheduled")
            - self.clock.now_ms()
    }
}

fn payload() -> EncodedPayload {
    EncodedPayload {
        data: "AAAAAA==".to_string(),
        sample_rate: 44100,
        sample_count: 1,
        sequence: 0,
    }
}

#[test]
fn test_connect_reaches_connected() {
    let mut h = Harness::new();
    h.client.connect();

    assert_eq!(h.client.state(), ConnectionState::Connecting);
    assert!(h.client.timers().is_armed(TimerKind::ConnectTimeout));
    assert_eq!(h.transport.open_count(), 1);

    h.open();

    assert_eq!(h.client.state(), ConnectionState::Connected);
    assert_eq!(
        h.observer.states(),
        vec![ConnectionState::Connecting, ConnectionState::Connected]
    );
    assert_eq!(h.observer.tiers(), vec![QualityTier::Unknown]);
    assert!(h.observer.notifications().contains(&Notification::Connected));

    assert!(!h.client.timers().is_armed(TimerKind::ConnectTimeout));
    assert!(h.client.timers().is_armed(TimerKind::Heartbeat));
    assert!(h.client.timers().is_armed(TimerKind::HealthCheck));
}

#[test]
fn test_connect_twice_opens_once() {
    let mut h = Harness::new();
    h.connect();
    h.client.connect();

    assert_eq!(h.transport.open_count(), 1);
    assert_eq!(h.client.state(), ConnectionState::Connected);
}

#[test]
fn test_abnormal_close_clears_session_and_schedules_reconnect() {
    let mut h = Harness::new();
    h.connect();

    let session_id = h.client.start_recording().expect("start should succeed");
    assert!(session_id.starts_with("session_"));
    assert_eq!(h.transport.sent_kinds(), vec!["start_recording"]);

    h.close(ABNORMAL_CLOSURE);

    assert!(h.client.session().is_none());
    assert_eq!(h.client.state(), ConnectionState::Reconnecting);
    assert_eq!(
        h.observer.states().last(),
        Some(&ConnectionState::Reconnecting)
    );
    assert!(h
        .observer
        .notifications()
        .iter()
        .any(|n| matches!(n, Notification::Disconnected { code: 1006, .. })));

    // attempt 1, one failure, score 80, just connected: 1000 * 1.5 * 1.2
    let delay = h.reconnect_delay();
    assert!((1_000..=60_000).contains(&delay));
    assert_eq!(delay, 1_800);
    assert_eq!(h.client.health().health_score, 80);
}

#[test]
fn test_reconnect_never_resurrects_previous_session() {
    let mut h = Harness::new();
    h.connect();
    let first = h.client.start_recording().expect("start should succeed");

    h.close(ABNORMAL_CLOSURE);
    h.fire(TimerKind::Reconnect);
    assert_eq!(h.client.state(), ConnectionState::Connecting);
    assert_eq!(h.transport.open_count(), 2);

    h.open();
    assert_eq!(h.client.state(), ConnectionState::Connected);
    assert!(h.client.session().is_none());
    assert_eq!(h.client.reconnect_attempts(), 0);

    h.transport.clear_sent();
    let result = h.client.send_audio_data(payload());
    assert!(matches!(result, Err(EngineError::NoActiveSession)));
    assert!(h.transport.sent().is_empty());

    let second = h.client.start_recording().expect("start should succeed");
    assert_ne!(first, second);
}

#[test]
fn test_exhausted_attempts_enter_failed_without_timer() {
    let mut h = Harness::new();
    h.transport.fail_open(true);

    h.client.connect();
    let mut reconnects = 0;
    while h.client.state() == ConnectionState::Reconnecting {
        h.fire(TimerKind::Reconnect);
        reconnects += 1;
        assert!(reconnects <= 15, "client kept reconnecting past the limit");
    }

    assert_eq!(reconnects, 15);
    assert_eq!(h.client.state(), ConnectionState::Failed);
    assert!(!h.client.timers().is_armed(TimerKind::Reconnect));
    assert_eq!(h.client.next_timer_deadline(), None);
    assert_eq!(h.observer.errors().len(), 1);

    let connecting = h
        .observer
        .states()
        .into_iter()
        .filter(|s| *s == ConnectionState::Connecting)
        .count();
    assert_eq!(connecting, 16);

    // Plain connect does not leave failed
    h.client.connect();
    assert_eq!(h.client.state(), ConnectionState::Failed);
}

#[test]
fn test_force_reconnect_leaves_failed_and_halves_counters() {
    let mut h = Harness::new();
    h.transport.fail_open(true);
    h.client.connect();
    while h.client.state() == ConnectionState::Reconnecting {
        h.fire(TimerKind::Reconnect);
    }
    assert_eq!(h.client.reconnect_attempts(), 15);
    assert_eq!(h.client.consecutive_failures(), 16);

    h.transport.fail_open(false);
    h.client.force_reconnect();

    assert_eq!(h.client.state(), ConnectionState::Connecting);
    assert_eq!(h.client.reconnect_attempts(), 7);
    assert_eq!(h.client.consecutive_failures(), 8);

    h.open();
    assert_eq!(h.client.state(), ConnectionState::Connected);
    assert_eq!(h.client.reconnect_attempts(), 0);
    assert_eq!(h.client.consecutive_failures(), 0);
}

#[test]
fn test_stale_timer_tokens_are_noops() {
    let mut h = Harness::new();
    h.connect();
    let heartbeat = h
        .client
        .timers()
        .token(TimerKind::Heartbeat)
        .expect("heartbeat armed");

    h.close(NORMAL_CLOSURE);
    h.clock.advance(20_000);
    h.client.fire_timer(heartbeat);

    assert!(h.transport.sent().is_empty());
    assert_eq!(h.client.state(), ConnectionState::Disconnected);

    // A reconnect token cancelled by a forced reconnect does nothing either
    let mut h = Harness::new();
    h.connect();
    h.close(ABNORMAL_CLOSURE);
    let reconnect = h
        .client
        .timers()
        .token(TimerKind::Reconnect)
        .expect("reconnect armed");
    h.client.force_reconnect();
    let opens = h.transport.open_count();

    h.client.fire_timer(reconnect);
    assert_eq!(h.transport.open_count(), opens);
    assert_eq!(h.client.state(), ConnectionState::Connecting);
}

#[test]
fn test_stop_recording_is_idempotent() {
    let mut h = Harness::new();
    h.connect();
    let session_id = h.client.start_recording().expect("start should succeed");

    let outcome = h.client.stop_recording();
    assert_eq!(
        outcome,
        StopOutcome::Stopped {
            session_id,
            delivered: true
        }
    );
    assert_eq!(h.client.stop_recording(), StopOutcome::AlreadyStopped);
    assert_eq!(
        h.transport.sent_kinds(),
        vec!["start_recording", "stop_recording"]
    );
}

#[test]
fn test_audio_requires_connection_and_session() {
    let mut h = Harness::new();

    let result = h.client.send_audio_data(payload());
    assert!(matches!(
        result,
        Err(EngineError::NotConnected {
            state: ConnectionState::Disconnected
        })
    ));

    h.connect();
    let result = h.client.send_audio_data(payload());
    assert!(matches!(result, Err(EngineError::NoActiveSession)));
    assert!(h.client.queue().is_empty());
    assert!(h.transport.sent().is_empty());

    let session_id = h.client.start_recording().expect("start should succeed");
    let delivery = h.client.send_audio_data(payload()).expect("audio accepted");
    assert_eq!(delivery, Delivery::Sent);

    match h.transport.sent_messages().last() {
        Some(ProtocolMessage::AudioData {
            session_id: sent_for,
            sample_rate,
            data_size,
            ..
        }) => {
            assert_eq!(sent_for, &session_id);
            assert_eq!(*sample_rate, 44100);
            assert_eq!(*data_size, 1);
        }
        other => panic!("expected audio_data, got {:?}", other),
    }
}

#[test]
fn test_start_recording_preconditions() {
    let mut h = Harness::new();
    assert!(matches!(
        h.client.start_recording(),
        Err(EngineError::NotConnected { .. })
    ));

    h.connect();
    let session_id = h.client.start_recording().expect("start should succeed");
    match h.client.start_recording() {
        Err(EngineError::AlreadyRecording { session_id: active }) => {
            assert_eq!(active, session_id)
        }
        other => panic!("expected AlreadyRecording, got {:?}", other),
    }
}

#[test]
fn test_start_recording_rolls_back_on_send_failure() {
    let mut h = Harness::new();
    h.connect();
    h.transport.fail_next_sends(1);

    let result = h.client.start_recording();
    assert!(matches!(result, Err(EngineError::Send(_))));
    assert!(h.client.session().is_none());
    assert!(h.client.queue().is_empty());
    assert_eq!(h.client.health().health_score, 90);

    assert!(h.client.start_recording().is_ok());
    assert!(h.client.is_recording());
}

#[test]
fn test_pong_records_latency_and_tier() {
    let mut h = Harness::new();
    h.connect();

    h.advance(15_000);
    assert_eq!(h.transport.sent_kinds(), vec!["ping"]);
    assert!(h.client.timers().is_armed(TimerKind::PongTimeout));

    h.clock.advance(50);
    h.server_says(r#"{"type":"pong","timestamp":1.0}"#);

    let health = h.client.health();
    assert_eq!(health.last_latency_ms, Some(50.0));
    assert_eq!(health.average_latency_ms, Some(50.0));
    assert_eq!(health.health_score, 100);
    assert_eq!(health.quality_tier, QualityTier::Excellent);
    assert!(!h.client.timers().is_armed(TimerKind::PongTimeout));
    assert_eq!(
        h.observer.tiers(),
        vec![QualityTier::Unknown, QualityTier::Excellent]
    );
}

#[test]
fn test_missed_pong_closes_with_heartbeat_timeout() {
    let mut h = Harness::new();
    h.connect();

    h.advance(15_000);
    h.advance(15_000);

    assert!(h
        .transport
        .closed()
        .iter()
        .any(|(code, _)| *code == HEARTBEAT_TIMEOUT));
    assert_eq!(h.client.state(), ConnectionState::Reconnecting);
    assert_eq!(h.client.health().health_score, 75);
    assert_eq!(h.client.health().missed_pongs, 1);

    let states = h.observer.states();
    let tail = &states[states.len() - 2..];
    assert_eq!(tail, &[ConnectionState::Error, ConnectionState::Reconnecting]);
}

#[test]
fn test_pong_timeout_grows_with_missed_pongs() {
    let config = ClientConfig {
        pong_timeout_base_ms: 1_000,
        pong_timeout_step_ms: 500,
        pong_timeout_max_ms: 1_800,
        ..ClientConfig::default()
    };
    let mut h = Harness::with(config, Box::new(FixedPolicy::new(1_000)));
    assert_eq!(h.client.pong_timeout_ms(), 1_000);

    for expected in [1_500, 1_800] {
        h.connect();
        h.fire(TimerKind::Heartbeat);
        h.fire(TimerKind::PongTimeout);
        assert_eq!(h.client.pong_timeout_ms(), expected);
        h.fire(TimerKind::Reconnect);
        h.open();
        h.close(NORMAL_CLOSURE);
    }
}

#[test]
fn test_normal_close_does_not_reconnect() {
    let mut h = Harness::new();
    h.connect();
    h.close(NORMAL_CLOSURE);

    assert_eq!(h.client.state(), ConnectionState::Disconnected);
    assert_eq!(h.client.next_timer_deadline(), None);
    assert_eq!(h.client.reconnect_attempts(), 0);
    assert_eq!(h.observer.tiers().last(), Some(&QualityTier::Disconnected));
}

#[test]
fn test_transport_error_routes_into_reconnect() {
    let mut h = Harness::new();
    h.connect();
    let conn = h.client.connection_id();

    h.client.handle_transport_event(TransportEvent::Error {
        conn,
        message: "connection reset".to_string(),
    });

    assert_eq!(h.transport.closed()[0].0, TRANSPORT_FAILURE);
    let states = h.observer.states();
    assert_eq!(
        &states[states.len() - 2..],
        &[ConnectionState::Error, ConnectionState::Reconnecting]
    );
}

#[test]
fn test_connect_timeout_schedules_reconnect() {
    let mut h = Harness::new();
    h.client.connect();

    h.advance(10_000);

    assert_eq!(h.transport.closed()[0].0, CONNECT_TIMEOUT);
    assert_eq!(h.client.state(), ConnectionState::Reconnecting);
    assert_eq!(h.client.reconnect_attempts(), 1);
}

#[test]
fn test_events_from_previous_connection_are_ignored() {
    let mut h = Harness::new();
    h.connect();
    let old = h.client.connection_id();

    h.close(ABNORMAL_CLOSURE);
    h.fire(TimerKind::Reconnect);
    assert_eq!(h.client.state(), ConnectionState::Connecting);

    h.client
        .handle_transport_event(TransportEvent::Opened { conn: old });
    assert_eq!(h.client.state(), ConnectionState::Connecting);

    h.client.handle_transport_event(TransportEvent::Closed {
        conn: old,
        code: ABNORMAL_CLOSURE,
        reason: String::new(),
    });
    assert_eq!(h.client.state(), ConnectionState::Connecting);
    assert_eq!(h.client.reconnect_attempts(), 1);
}

#[test]
fn test_offline_messages_drain_in_order_on_connect() {
    let mut h = Harness::new();

    for i in 1..=3 {
        let delivery = h.client.send_message(ProtocolMessage::Ping {
            timestamp: Some(i as f64),
        });
        assert_eq!(delivery, Delivery::Queued);
    }
    assert_eq!(h.client.queue().len(), 3);

    h.connect();

    let timestamps: Vec<f64> = h
        .transport
        .sent_messages()
        .into_iter()
        .filter_map(|m| match m {
            ProtocolMessage::Ping { timestamp } => timestamp,
            _ => None,
        })
        .collect();
    assert_eq!(timestamps, vec![1.0, 2.0, 3.0]);
    assert!(h.client.queue().is_empty());
}

#[test]
fn test_queue_overflow_keeps_newest() {
    let config = ClientConfig {
        max_queue_size: 3,
        ..ClientConfig::default()
    };
    let mut h = Harness::with(config, Box::new(FixedPolicy::new(1_000)));

    for i in 1..=5 {
        h.client.send_message(ProtocolMessage::Ping {
            timestamp: Some(i as f64),
        });
    }
    assert_eq!(h.client.queue().len(), 3);
    assert_eq!(h.client.stats().messages_dropped, 2);

    h.connect();
    let timestamps: Vec<Option<f64>> = h
        .transport
        .sent_messages()
        .into_iter()
        .map(|m| match m {
            ProtocolMessage::Ping { timestamp } => timestamp,
            _ => None,
        })
        .collect();
    assert_eq!(timestamps, vec![Some(3.0), Some(4.0), Some(5.0)]);
}

#[test]
fn test_session_messages_purged_with_session() {
    let mut h = Harness::new();
    h.connect();
    h.client.start_recording().expect("start should succeed");

    // Socket already gone, close not reported yet
    h.transport.set_open(false);
    let delivery = h.client.send_audio_data(payload()).expect("audio accepted");
    assert_eq!(delivery, Delivery::Queued);
    assert_eq!(h.client.queue().len(), 1);

    h.close(ABNORMAL_CLOSURE);
    assert!(h.client.queue().is_empty());
    assert_eq!(h.client.stats().messages_purged, 1);
}

#[test]
fn test_server_messages_update_client() {
    let mut h = Harness::new();
    h.connect();

    h.server_says(r#"{"type":"connection_established","client_id":"client_7","message":"hi"}"#);
    assert_eq!(h.client.snapshot().client_id.as_deref(), Some("client_7"));

    let session_id = h.client.start_recording().expect("start should succeed");
    h.server_says(&format!(
        r#"{{"type":"recording_started","session_id":"{}"}}"#,
        session_id
    ));
    assert!(h.client.session().map(|s| s.acknowledged).unwrap_or(false));

    h.server_says(&format!(
        r#"{{"type":"detection_result","session_id":"{}","timestamp":1.5,"prediction":1,"confidence":0.93,"status":"NG","message":"anomaly"}}"#,
        session_id
    ));
    let results = h.observer.results();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_anomaly());
    assert_eq!(h.client.stats().anomalies_detected, 1);

    h.server_says(r#"{"type":"error","message":"model not loaded"}"#);
    assert_eq!(h.observer.errors(), vec!["model not loaded".to_string()]);
}

#[test]
fn test_bad_server_frames_are_counted_and_dropped() {
    let mut h = Harness::new();
    h.connect();

    h.server_says("not json");
    h.server_says(r#"{"type":"firmware_update"}"#);
    h.server_says(r#"{"type":"detection_result","timestamp":1.0,"prediction":3,"confidence":0.5}"#);

    assert_eq!(h.client.stats().protocol_errors, 3);
    assert_eq!(h.client.state(), ConnectionState::Connected);
    assert!(h.observer.results().is_empty());
}

#[test]
fn test_server_ping_is_answered() {
    let mut h = Harness::new();
    h.connect();

    h.server_says(r#"{"type":"ping","timestamp":42.0}"#);
    assert_eq!(h.transport.sent_kinds(), vec!["pong"]);
}

#[test]
fn test_disconnect_stops_session_and_timers() {
    let mut h = Harness::new();
    h.connect();
    h.client.start_recording().expect("start should succeed");

    h.client.disconnect();

    assert_eq!(
        h.transport.sent_kinds(),
        vec!["start_recording", "stop_recording"]
    );
    assert_eq!(
        h.transport.closed(),
        vec![(NORMAL_CLOSURE, "client disconnect".to_string())]
    );
    assert_eq!(h.client.state(), ConnectionState::Disconnected);
    assert!(h.client.session().is_none());
    assert_eq!(h.client.next_timer_deadline(), None);
}

#[test]
fn test_idle_connection_loses_health() {
    let config = ClientConfig {
        heartbeat_interval_ms: 10_000_000,
        ..ClientConfig::default()
    };
    let mut h = Harness::with(config, Box::new(FixedPolicy::new(1_000)));
    h.connect();

    h.advance(30_000);
    assert_eq!(h.client.health().health_score, 100);

    h.advance(30_000);
    assert_eq!(h.client.health().health_score, 95);
    assert_eq!(h.client.health().quality_tier, QualityTier::Unknown);
}

#[test]
fn test_snapshot_reflects_client() {
    let mut h = Harness::new();
    h.connect();
    let session_id = h.client.start_recording().expect("start should succeed");

    let snapshot = h.client.snapshot();
    assert_eq!(snapshot.state, ConnectionState::Connected);
    assert_eq!(
        snapshot.session.map(|s| s.session_id),
        Some(session_id)
    );
    assert_eq!(snapshot.reconnect_policy, "adaptive");
    assert_eq!(snapshot.stats.sessions_started, 1);
    assert_eq!(snapshot.queue_capacity, 100);

    let json = serde_json::to_value(h.client.snapshot()).expect("snapshot serializes");
    assert_eq!(json["state"], "connected");
    assert_eq!(json["health"]["quality_tier"], "unknown");
}

fn disconnect_notifications(h: &Harness) -> Vec<(u16, String)> {
    h.observer
        .notifications()
        .into_iter()
        .filter_map(|n| match n {
            Notification::Disconnected { code, reason } => Some((code, reason)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_overlapping_pings_measure_from_first_unanswered() {
    let mut h = Harness::new();
    h.connect();
    h.fire(TimerKind::Heartbeat);
    h.fire(TimerKind::PongTimeout);
    h.fire(TimerKind::Reconnect);
    h.open();

    // One missed pong stretches the timeout past the heartbeat interval
    assert_eq!(h.client.pong_timeout_ms(), 17_000);
    h.transport.clear_sent();

    h.advance(15_000);
    h.advance(15_000);
    assert_eq!(h.transport.sent_kinds(), vec!["ping", "ping"]);
    assert_eq!(h.client.state(), ConnectionState::Connected);

    h.clock.advance(1_000);
    h.server_says(r#"{"type":"pong","timestamp":1.0}"#);

    assert_eq!(h.client.health().last_latency_ms, Some(16_000.0));
    assert_eq!(h.client.pong_timeout_ms(), 15_000);
}

#[test]
fn test_stop_recording_flushes_queued_windows_first() {
    let mut h = Harness::new();
    h.connect();
    h.client.start_recording().expect("start should succeed");

    h.transport.fail_next_sends(1);
    let delivery = h.client.send_audio_data(payload()).expect("audio accepted");
    assert_eq!(delivery, Delivery::Queued);
    assert_eq!(h.client.queue().len(), 1);

    let outcome = h.client.stop_recording();

    assert!(matches!(outcome, StopOutcome::Stopped { delivered: true, .. }));
    assert_eq!(
        h.transport.sent_kinds(),
        vec!["start_recording", "audio_data", "stop_recording"]
    );
    assert!(h.client.queue().is_empty());
    assert_eq!(h.client.stats().messages_purged, 0);
}

#[test]
fn test_stop_during_close_closes_once() {
    let mut h = Harness::new();
    h.connect();
    h.client.start_recording().expect("start should succeed");

    h.client.disconnect();
    assert_eq!(h.client.stop_recording(), StopOutcome::AlreadyStopped);
    h.client.disconnect();

    assert_eq!(h.transport.closed().len(), 1);
    assert_eq!(disconnect_notifications(&h).len(), 1);
    assert_eq!(
        h.transport.sent_kinds(),
        vec!["start_recording", "stop_recording"]
    );

    // Peer-initiated close: the session is already gone, nothing is closed again
    let mut h = Harness::new();
    h.connect();
    h.client.start_recording().expect("start should succeed");
    h.close(NORMAL_CLOSURE);

    assert_eq!(h.client.stop_recording(), StopOutcome::AlreadyStopped);
    assert!(h.transport.closed().is_empty());
    assert_eq!(disconnect_notifications(&h).len(), 1);
    assert_eq!(h.client.state(), ConnectionState::Disconnected);
}

#[test]
fn test_force_reconnect_while_connected_stops_session() {
    let mut h = Harness::new();
    h.connect();
    h.client.start_recording().expect("start should succeed");

    h.client.force_reconnect();

    assert_eq!(
        h.transport.sent_kinds(),
        vec!["start_recording", "stop_recording"]
    );
    assert_eq!(
        h.transport.closed(),
        vec![(NORMAL_CLOSURE, "forced reconnect".to_string())]
    );
    assert_eq!(
        disconnect_notifications(&h),
        vec![(NORMAL_CLOSURE, "forced reconnect".to_string())]
    );
    assert!(h.client.session().is_none());
    assert_eq!(h.client.state(), ConnectionState::Connecting);
}
