// Integration tests for heartbeat latency tracking and quality tiers

use soundditect_stream::engine::{HealthEvent, HealthMonitor, QualityTier, MAX_HEALTH_SCORE};

#[test]
fn test_latency_is_smoothed() {
    let mut health = HealthMonitor::default();
    health.reset(0);

    health.on_ping_sent(1_000);
    assert_eq!(health.on_pong(1_100), Some(100.0));
    assert_eq!(health.average_latency_ms(), Some(100.0));

    health.on_ping_sent(2_000);
    assert_eq!(health.on_pong(2_200), Some(200.0));
    let average = health.average_latency_ms().expect("average after two pongs");
    assert!((average - 120.0).abs() < 1e-9);
}

#[test]
fn test_repeated_ping_keeps_first_send_time() {
    let mut health = HealthMonitor::default();
    health.reset(0);

    health.on_ping_sent(15_000);
    health.on_ping_sent(30_000);
    assert!(health.awaiting_pong());

    assert_eq!(health.on_pong(31_000), Some(16_000.0));
    assert!(!health.awaiting_pong());
}

#[test]
fn test_pong_without_ping_is_not_a_sample() {
    let mut health = HealthMonitor::default();
    health.reset(0);

    assert_eq!(health.on_pong(500), None);
    assert_eq!(health.average_latency_ms(), None);
    assert!(!health.awaiting_pong());
}

#[test]
fn test_score_is_clamped() {
    let mut health = HealthMonitor::default();
    health.reset(0);

    assert_eq!(health.apply(HealthEvent::HeartbeatSuccess), MAX_HEALTH_SCORE);
    for _ in 0..10 {
        health.apply(HealthEvent::HeartbeatTimeout);
    }
    assert_eq!(health.health_score(), 0);
    assert_eq!(health.score(-1), 0);
    assert_eq!(health.score(250), 100);
}

#[test]
fn test_event_penalties() {
    let mut health = HealthMonitor::default();
    health.reset(0);

    health.apply(HealthEvent::SendFailed);
    assert_eq!(health.health_score(), 90);
    health.apply(HealthEvent::UnexpectedClose);
    assert_eq!(health.health_score(), 70);
    health.apply(HealthEvent::Idle);
    assert_eq!(health.health_score(), 65);
    health.on_missed_pong();
    assert_eq!(health.health_score(), 40);
}

#[test]
fn test_tier_boundaries() {
    assert_eq!(HealthMonitor::tier_for(99.0, 81), QualityTier::Excellent);
    assert_eq!(HealthMonitor::tier_for(100.0, 81), QualityTier::Good);
    assert_eq!(HealthMonitor::tier_for(50.0, 80), QualityTier::Good);
    assert_eq!(HealthMonitor::tier_for(199.0, 61), QualityTier::Good);
    assert_eq!(HealthMonitor::tier_for(200.0, 100), QualityTier::Fair);
    assert_eq!(HealthMonitor::tier_for(499.0, 41), QualityTier::Fair);
    assert_eq!(HealthMonitor::tier_for(10.0, 40), QualityTier::Poor);
    assert_eq!(HealthMonitor::tier_for(500.0, 100), QualityTier::Poor);
}

#[test]
fn test_tier_without_latency_sample() {
    let mut health = HealthMonitor::default();
    health.reset(0);

    assert_eq!(health.current_tier(false), QualityTier::Disconnected);
    assert_eq!(health.current_tier(true), QualityTier::Unknown);

    health.score(-60);
    assert_eq!(health.current_tier(true), QualityTier::Poor);
}

#[test]
fn test_tier_changes_reported_once() {
    let mut health = HealthMonitor::default();
    health.reset(0);

    assert_eq!(health.update_tier(false), None);
    assert_eq!(health.update_tier(true), Some(QualityTier::Unknown));
    assert_eq!(health.update_tier(true), None);

    health.on_ping_sent(0);
    health.on_pong(30);
    assert_eq!(health.update_tier(true), Some(QualityTier::Excellent));
    assert_eq!(health.update_tier(false), Some(QualityTier::Disconnected));
}

#[test]
fn test_idle_penalty_after_threshold() {
    let mut health = HealthMonitor::new(60_000);
    health.reset(0);

    assert!(!health.check_idle(59_999));
    assert!(health.check_idle(60_000));
    assert_eq!(health.health_score(), 95);

    health.record_activity(61_000);
    assert!(!health.check_idle(100_000));
}
