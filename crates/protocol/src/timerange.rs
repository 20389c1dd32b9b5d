use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Absolute, half-open time window `[start, end)`.
///
/// Relative phrasings ("last week") are resolved to absolute instants before
/// a query is canonicalized, so the window itself is part of the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window covering the last `days` days ending at `now`.
    pub fn days_back(days: i64, now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::days(days),
            end: now,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Truncate both bounds to whole seconds so equivalent windows produced
    /// from different clock reads canonicalize identically.
    pub fn truncated_to_seconds(&self) -> Self {
        Self {
            start: truncate_subsec(self.start),
            end: truncate_subsec(self.end),
        }
    }
}

fn truncate_subsec(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(ts.timestamp(), 0).unwrap_or(ts)
}
