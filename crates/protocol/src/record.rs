use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timerange::TimeRange;

/// Outcome of one test execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

impl TestStatus {
    /// Parse an upstream status string ("PASSED", "failed", ...).
    pub fn parse(raw: &str) -> Option<TestStatus> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "passed" | "pass" => Some(TestStatus::Passed),
            "failed" | "fail" => Some(TestStatus::Failed),
            "skipped" | "skip" => Some(TestStatus::Skipped),
            _ => None,
        }
    }
}

/// One normalized execution record, read-only to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub test_id: String,
    pub test_name: String,
    pub run_id: String,
    pub status: TestStatus,
    pub duration_ms: Option<u64>,
    pub platform: Option<String>,
    pub owner: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Normalized failure text, present only for failed executions.
    pub error_signature: Option<String>,
}

/// Push notification that new execution data landed upstream.
///
/// Delivery is treated as best-effort; TTL expiry remains the fallback
/// staleness bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDataEvent {
    pub project: String,
    pub window: TimeRange,
}
