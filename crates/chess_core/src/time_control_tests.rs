use super::*;
use std::thread;

#[test]
fn test_search_limits_depth_only() {
    let limits = SearchLimits::depth(5);
    assert_eq!(limits.depth, Some(5));
    assert!(limits.move_time.is_none());
    assert_eq!(limits.time_budget(Duration::ZERO), (None, None));
    assert!(!limits.time_control.is_stopped());
}

#[test]
fn test_move_time_budget_subtracts_overhead() {
    let limits = SearchLimits::time(Duration::from_millis(100));
    let (soft, hard) = limits.time_budget(Duration::from_millis(10));
    assert_eq!(soft, Some(Duration::from_millis(90)));
    assert_eq!(hard, Some(Duration::from_millis(90)));
}

#[test]
fn test_clock_budget() {
    // 60s left, 1s increment, default 30 moves to go
    let limits = SearchLimits::clock(Duration::from_secs(60), Duration::from_secs(1), None);
    let (soft, hard) = limits.time_budget(Duration::ZERO);
    assert_eq!(soft, Some(Duration::from_millis(2750)));
    assert_eq!(hard, Some(Duration::from_millis(13750)));

    // Hard budget never exceeds half the remaining time
    let limits = SearchLimits::clock(Duration::from_secs(4), Duration::ZERO, Some(1));
    let (soft, hard) = limits.time_budget(Duration::ZERO);
    assert_eq!(hard, Some(Duration::from_secs(2)));
    assert_eq!(soft, Some(Duration::from_secs(2)));
}

#[test]
fn test_infinite_ignores_budgets() {
    let mut limits = SearchLimits::infinite();
    limits.move_time = Some(Duration::from_millis(1));
    limits.nodes = Some(10);
    assert_eq!(limits.time_budget(Duration::ZERO), (None, None));
    let tc = TimeControl::new();
    tc.start(&limits, Duration::ZERO);
    assert!(!tc.check(1_000_000));
    assert_eq!(tc.node_limit(), None);
}

#[test]
fn test_time_control_expiry() {
    let limits = SearchLimits::time(Duration::from_millis(10));
    let tc = limits.time_control.clone();
    tc.start(&limits, Duration::ZERO);
    assert!(!tc.is_stopped());

    thread::sleep(Duration::from_millis(20));
    assert!(tc.soft_expired());
    assert!(tc.check(0));
    assert!(limits.time_control.is_stopped());
}

#[test]
fn test_node_limit_stops() {
    let limits = SearchLimits::nodes(5_000);
    let tc = TimeControl::new();
    tc.start(&limits, Duration::ZERO);
    assert!(!tc.check(4_999));
    assert!(tc.check(5_000));
    assert!(tc.is_stopped());
}

#[test]
fn test_time_control_manual_stop_and_restart() {
    let tc = TimeControl::new();
    tc.start(&SearchLimits::infinite(), Duration::ZERO);
    thread::sleep(Duration::from_millis(5));
    assert!(!tc.check(0));
    tc.stop();
    assert!(tc.is_stopped());
    tc.start(&SearchLimits::infinite(), Duration::ZERO);
    assert!(!tc.is_stopped());
}

#[test]
fn test_scale_soft_is_clamped() {
    let limits = SearchLimits::clock(Duration::from_secs(60), Duration::ZERO, Some(20));
    let tc = TimeControl::new();
    tc.start(&limits, Duration::ZERO);
    // soft 3s, hard 15s
    assert_eq!(tc.soft_limit(), Some(Duration::from_secs(3)));
    tc.scale_soft(1.3);
    assert_eq!(tc.soft_limit(), Some(Duration::from_millis(3900)));
    for _ in 0..20 {
        tc.scale_soft(0.5);
    }
    assert_eq!(tc.soft_limit(), Some(Duration::from_millis(1500)));
    for _ in 0..40 {
        tc.scale_soft(2.0);
    }
    assert_eq!(tc.soft_limit(), Some(Duration::from_secs(15)));
}
