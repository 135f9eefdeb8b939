use std::time::Duration;

use chrono::NaiveTime;

/// Polling cadence settings. The coordinator reads these before every
/// scheduling decision, so replacing the config takes effect on the next
/// cycle without restarting the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleConfig {
    /// Interval used inside the high-frequency window.
    pub high_scan_interval: Duration,
    /// Interval used outside the high-frequency window.
    pub low_scan_interval: Duration,
    /// Start of the high-frequency window.
    pub high_scan_start: NaiveTime,
    /// End of the high-frequency window (start of the low-frequency one).
    pub low_scan_start: NaiveTime,
    /// Polls within this much time of a successful write are skipped; the
    /// cloud returns stale data for a short while after a mutation.
    pub scan_ignore: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            high_scan_interval: Duration::from_secs(10 * 60),
            low_scan_interval: Duration::from_secs(30 * 60),
            high_scan_start: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            low_scan_start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            scan_ignore: Duration::from_secs(30),
        }
    }
}
