use std::time::{Duration, Instant};

use chrono::NaiveTime;
use rand::Rng;

use crate::config::ScheduleConfig;
use crate::limits::RateLimitSnapshot;

/// True when `now` lies inside the half-open window `[start, end)`. A
/// start after the end means the window wraps past midnight.
pub fn in_window(now: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start <= end {
        now >= start && now < end
    } else {
        now >= start || now < end
    }
}

/// Interval until the next poll. `now` is sampled once by the caller and
/// passed in, so a decision never straddles a clock edge. The sampler
/// draws the transition-window jitter from an inclusive seconds range;
/// production uses [`next_interval_now`], tests inject a fixed draw.
pub fn next_interval<F>(
    now: NaiveTime,
    config: &ScheduleConfig,
    limits: RateLimitSnapshot,
    sample: F,
) -> Duration
where
    F: FnOnce(u64, u64) -> u64,
{
    let mut interval = config.low_scan_interval;
    if in_window(now, config.high_scan_start, config.low_scan_start) {
        interval = config.high_scan_interval;
    } else if in_window(now, config.low_scan_start, transition_end(config)) {
        // Randomize the first low-cadence interval so installations do
        // not all switch at the window boundary.
        let low_secs = config.low_scan_interval.as_secs().max(60);
        interval = Duration::from_secs(sample(60, low_secs));
    }
    if limits.remaining_day == 0 {
        interval = interval.max(Duration::from_secs(limits.retry_after + 60));
    }
    interval
}

/// [`next_interval`] with the jitter drawn from the thread RNG.
pub fn next_interval_now(
    now: NaiveTime,
    config: &ScheduleConfig,
    limits: RateLimitSnapshot,
) -> Duration {
    next_interval(now, config, limits, |min, max| {
        rand::rng().random_range(min..=max)
    })
}

fn transition_end(config: &ScheduleConfig) -> NaiveTime {
    config.low_scan_start + chrono::Duration::seconds(config.high_scan_interval.as_secs() as i64)
}

/// Whether a poll due now should be skipped because a write landed less
/// than `scan_ignore` ago. The cloud keeps serving the pre-write state
/// for a short while after accepting a change.
pub fn should_skip(now: Instant, last_write: Option<Instant>, scan_ignore: Duration) -> bool {
    match last_write {
        Some(written) => now.duration_since(written) < scan_ignore,
        None => false,
    }
}
