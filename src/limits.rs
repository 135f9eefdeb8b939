use reqwest::header::HeaderMap;
use serde::Serialize;

/// Most recent request-quota numbers reported by the cloud. Refreshed from
/// the headers of every response; absent headers read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RateLimitSnapshot {
    pub limit_minute: u64,
    pub limit_day: u64,
    pub remaining_minute: u64,
    pub remaining_day: u64,
    /// Seconds the cloud asked us to wait, from `Retry-After`.
    pub retry_after: u64,
    /// Seconds until the minute window resets, from `RateLimit-Reset`.
    pub reset: u64,
}

impl RateLimitSnapshot {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        RateLimitSnapshot {
            limit_minute: header_u64(headers, "x-ratelimit-limit-minute"),
            limit_day: header_u64(headers, "x-ratelimit-limit-day"),
            remaining_minute: header_u64(headers, "x-ratelimit-remaining-minute"),
            remaining_day: header_u64(headers, "x-ratelimit-remaining-day"),
            retry_after: header_u64(headers, "retry-after"),
            reset: header_u64(headers, "ratelimit-reset"),
        }
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> u64 {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}
