use chrono::{DateTime, Duration, Utc};

pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Whole days elapsed between a unix timestamp and `now`, floored.
///
/// Timestamps in the future yield a negative count; callers clamp.
pub fn days_since_unix(timestamp: i64, now: DateTime<Utc>) -> i64 {
    (now.timestamp() - timestamp).div_euclid(SECONDS_PER_DAY)
}

/// Unix timestamp of the start of a trailing window of `days` ending at `now`
pub fn window_start_unix(now: DateTime<Utc>, days: i64) -> i64 {
    (now - Duration::days(days)).timestamp()
}

/// Convert Unix timestamp to DateTime<Utc>
pub fn from_unix_timestamp(timestamp: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp, 0)
}
