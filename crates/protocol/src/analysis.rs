use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Failures grouped under one normalized signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCluster {
    /// Lexicographically smallest signature among the merged group.
    pub signature: String,
    /// Sorted, deduplicated member test ids.
    pub test_ids: Vec<String>,
    /// Number of failing executions in the cluster.
    pub count: usize,
}

/// Aggregate statistics over the analyzed window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_executions: usize,
    pub unique_tests: usize,
    pub status_counts: BTreeMap<String, usize>,
    pub platform_counts: BTreeMap<String, usize>,
    /// Fraction of executions that failed, in `[0, 1]`.
    pub failure_rate: f64,
    pub avg_duration_ms: Option<f64>,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Derived analytics, immutable once computed.
///
/// Ordered collections keep the result deterministic for identical input
/// records and configuration, which is what makes it cacheable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub flaky_tests: BTreeSet<String>,
    pub clusters: Vec<FailureCluster>,
    pub ownership: BTreeMap<String, String>,
    pub stats: SummaryStats,
}

impl AnalysisResult {
    /// Tests excluded from flaky classification for lack of evidence are not
    /// recorded; absence from `flaky_tests` therefore never means "proven
    /// stable".
    pub fn is_flaky(&self, test_id: &str) -> bool {
        self.flaky_tests.contains(test_id)
    }
}
