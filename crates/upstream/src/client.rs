use async_trait::async_trait;
use runsight_protocol::{ExecutionRecord, QueryFilters};

use crate::error::Result;

/// Adapter over the external test-management service.
///
/// The core only reads execution records through this interface; pagination,
/// auth, and retries are the implementation's concern.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Fetch all execution records matching the filters.
    ///
    /// Filters the service cannot evaluate remotely are applied locally
    /// before records are returned, so callers always see a fully filtered
    /// set.
    async fn fetch_executions(&self, filters: &QueryFilters) -> Result<Vec<ExecutionRecord>>;
}

/// Local application of filters the wire API cannot express.
pub(crate) fn matches_filters(record: &ExecutionRecord, filters: &QueryFilters) -> bool {
    if let Some(platform) = &filters.platform {
        if record.platform.as_deref() != Some(platform.as_str()) {
            return false;
        }
    }
    if let Some(status) = filters.status {
        let record_status = match record.status {
            runsight_protocol::TestStatus::Passed => "passed",
            runsight_protocol::TestStatus::Failed => "failed",
            runsight_protocol::TestStatus::Skipped => "skipped",
        };
        if record_status != status.as_str() {
            return false;
        }
    }
    if let Some(range) = &filters.time_range {
        if !range.contains(record.timestamp) {
            return false;
        }
    }
    if !filters.job_ids.is_empty() && !filters.job_ids.iter().any(|id| id == &record.run_id) {
        return false;
    }
    if let Some(pattern) = &filters.test_name_pattern {
        if !record.test_name.contains(pattern.as_str()) {
            return false;
        }
    }
    if let Some(owner) = &filters.owner {
        if record.owner.as_deref() != Some(owner.as_str()) {
            return false;
        }
    }
    true
}
