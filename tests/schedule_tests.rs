use std::time::{Duration, Instant};

use chrono::NaiveTime;
use daikin_onecta::{
    in_window, next_interval, next_interval_now, should_skip, RateLimitSnapshot, ScheduleConfig,
};

fn t(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

fn healthy() -> RateLimitSnapshot {
    RateLimitSnapshot {
        limit_minute: 10,
        limit_day: 200,
        remaining_minute: 9,
        remaining_day: 150,
        ..Default::default()
    }
}

#[test]
fn window_contains_and_excludes() {
    let start = t(7, 0);
    let end = t(22, 0);
    assert!(in_window(t(7, 0), start, end));
    assert!(in_window(t(12, 0), start, end));
    assert!(!in_window(t(22, 0), start, end));
    assert!(!in_window(t(6, 59), start, end));
}

#[test]
fn window_wraps_past_midnight() {
    let start = t(22, 0);
    let end = t(7, 0);
    assert!(in_window(t(6, 0), start, end));
    assert!(in_window(t(22, 0), start, end));
    assert!(in_window(t(23, 0), start, end));
    assert!(!in_window(t(7, 0), start, end));
    assert!(!in_window(t(12, 0), start, end));
}

#[test]
fn peak_hours_use_high_interval() {
    let config = ScheduleConfig::default();
    let interval = next_interval(t(10, 0), &config, healthy(), |_, _| {
        unreachable!("no jitter inside the peak window")
    });
    assert_eq!(interval, Duration::from_secs(600));
}

#[test]
fn off_peak_hours_use_low_interval() {
    let config = ScheduleConfig::default();
    let interval = next_interval(t(23, 0), &config, healthy(), |_, _| {
        unreachable!("23:00 is past the transition window")
    });
    assert_eq!(interval, Duration::from_secs(1800));
}

#[test]
fn transition_window_uses_sampled_value() {
    let config = ScheduleConfig::default();
    let mut seen = None;
    let interval = next_interval(t(22, 5), &config, healthy(), |min, max| {
        seen = Some((min, max));
        120
    });
    assert_eq!(interval, Duration::from_secs(120));
    assert_eq!(seen, Some((60, 1800)));
}

#[test]
fn transition_window_ends_after_high_interval() {
    let config = ScheduleConfig::default();
    // 22:10 is the first moment past [22:00, 22:00 + 10min).
    let interval = next_interval(t(22, 10), &config, healthy(), |_, _| {
        unreachable!("22:10 is past the transition window")
    });
    assert_eq!(interval, Duration::from_secs(1800));
}

#[test]
fn thread_rng_jitter_stays_in_bounds() {
    let config = ScheduleConfig::default();
    for _ in 0..50 {
        let interval = next_interval_now(t(22, 0), &config, healthy());
        assert!(interval >= Duration::from_secs(60));
        assert!(interval <= Duration::from_secs(1800));
    }
}

#[test]
fn exhausted_quota_keeps_longer_normal_interval() {
    let config = ScheduleConfig::default();
    let limits = RateLimitSnapshot {
        remaining_day: 0,
        retry_after: 300,
        ..healthy()
    };
    let interval = next_interval(t(23, 0), &config, limits, |_, _| unreachable!());
    assert_eq!(interval, Duration::from_secs(1800));
}

#[test]
fn exhausted_quota_extends_past_retry_after() {
    let config = ScheduleConfig::default();
    let limits = RateLimitSnapshot {
        remaining_day: 0,
        retry_after: 3000,
        ..healthy()
    };
    let interval = next_interval(t(23, 0), &config, limits, |_, _| unreachable!());
    assert_eq!(interval, Duration::from_secs(3060));

    let peak = next_interval(t(10, 0), &config, limits, |_, _| unreachable!());
    assert_eq!(peak, Duration::from_secs(3060));
}

#[test]
fn skip_only_within_ignore_window() {
    let ignore = Duration::from_secs(30);
    let written = Instant::now();

    assert!(!should_skip(written, None, ignore));
    assert!(should_skip(
        written + Duration::from_secs(10),
        Some(written),
        ignore
    ));
    assert!(!should_skip(
        written + Duration::from_secs(30),
        Some(written),
        ignore
    ));
    assert!(!should_skip(
        written + Duration::from_secs(120),
        Some(written),
        ignore
    ));
}
