//! Wall-clock helpers.
//!
//! The simulation itself runs on discrete ticks; wall-clock time is only used to
//! label performance samples and log entries for display.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local};

/// Label used when a timestamp falls outside the representable range.
pub const UNKNOWN_LABEL: &str = "--:--:--";

/// Milliseconds since the Unix epoch. Returns 0 if the system clock is set before 1970.
#[must_use]
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Format an epoch-millisecond timestamp as a local-time `HH:MM:SS` label.
#[must_use]
pub fn wall_clock_label(epoch_ms: u128) -> String {
    i64::try_from(epoch_ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map_or_else(
            || UNKNOWN_LABEL.to_string(),
            |utc| utc.with_timezone(&Local).format("%H:%M:%S").to_string(),
        )
}
