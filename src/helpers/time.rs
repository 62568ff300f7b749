use chrono::{DateTime, Utc};
use tokio::time::Instant;

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn get_instant() -> Instant {
    Instant::now()
}

/// RFC 3339 rendering of a millisecond timestamp, `None` when out of range.
pub fn ms_to_rfc3339(ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(|date_time| date_time.to_rfc3339())
}
