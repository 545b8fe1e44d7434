//! Time utilities for record timestamps.

use chrono::{DateTime, Utc};

/// Returns the current Unix timestamp in seconds.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Render a Unix timestamp (seconds) as RFC 3339 in UTC.
///
/// Out-of-range values render as the raw number.
pub fn format_timestamp(ts: i64) -> String {
    match DateTime::<Utc>::from_timestamp(ts, 0) {
        Some(dt) => dt.to_rfc3339(),
        None => ts.to_string(),
    }
}
