// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Epoch-millisecond time helpers
//!
//! The scheduling core never resolves time zones: every timestamp is a UTC
//! epoch offset in milliseconds and calendar math is done on whole UTC days.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Milliseconds since the Unix epoch (UTC)
pub type Timestamp = i64;

/// Length of one day in milliseconds
pub const DAY_MS: i64 = 86_400_000;

/// Length of one week in milliseconds
pub const WEEK_MS: i64 = 7 * DAY_MS;

/// A half-open time window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Window {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// Window starting at `start` and spanning `days` whole days
    pub fn days(start: Timestamp, days: i64) -> Self {
        Self::new(start, start.saturating_add(days.saturating_mul(DAY_MS)))
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.start && ts < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Shrink the window so it spans at most `span`
    pub fn clamp_span(&self, span: Duration) -> Self {
        let limit = self.start.saturating_add(duration_millis(span));
        Self::new(self.start, self.end.min(limit))
    }
}

/// Index of the UTC day containing `ts` (day 0 is 1970-01-01)
pub fn day_index(ts: Timestamp) -> i64 {
    ts.div_euclid(DAY_MS)
}

/// Milliseconds elapsed since UTC midnight
pub fn millis_of_day(ts: Timestamp) -> i64 {
    ts.rem_euclid(DAY_MS)
}

/// Weekday of the UTC day containing `ts`
pub fn weekday_of(ts: Timestamp) -> chrono::Weekday {
    // 1970-01-01 was a Thursday
    match (day_index(ts) + 3).rem_euclid(7) {
        0 => chrono::Weekday::Mon,
        1 => chrono::Weekday::Tue,
        2 => chrono::Weekday::Wed,
        3 => chrono::Weekday::Thu,
        4 => chrono::Weekday::Fri,
        5 => chrono::Weekday::Sat,
        _ => chrono::Weekday::Sun,
    }
}

/// Timestamp of the Monday 00:00 UTC that starts the week containing `ts`
pub fn week_start(ts: Timestamp) -> Timestamp {
    let offset = i64::from(weekday_of(ts).num_days_from_monday());
    (day_index(ts) - offset) * DAY_MS
}

/// Convert a duration to whole milliseconds, saturating at `i64::MAX`
pub fn duration_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

/// Render a timestamp as RFC 3339, falling back to the raw number
pub fn format_rfc3339(ts: Timestamp) -> String {
    chrono::DateTime::from_timestamp_millis(ts)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .unwrap_or_else(|| ts.to_string())
}
