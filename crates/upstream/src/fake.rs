//! In-process upstream double for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use runsight_protocol::{ExecutionRecord, QueryFilters};

use crate::client::{matches_filters, UpstreamClient};
use crate::error::{Result, UpstreamError};

/// [`UpstreamClient`] backed by a fixed record set.
///
/// Counts fetches so tests can assert the singleflight discipline, and can
/// be switched into a failing mode to exercise degraded paths.
#[derive(Default)]
pub struct InMemoryUpstream {
    records: Mutex<Vec<ExecutionRecord>>,
    pub fetch_calls: AtomicUsize,
    fail_next: AtomicUsize,
    /// Artificial latency per fetch, to widen concurrency windows in tests.
    pub latency: Option<std::time::Duration>,
}

impl InMemoryUpstream {
    pub fn new(records: Vec<ExecutionRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    pub fn with_latency(mut self, latency: std::time::Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next `n` fetches fail as exhausted retries.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn push_records(&self, mut records: Vec<ExecutionRecord>) {
        self.records.lock().unwrap().append(&mut records);
    }
}

#[async_trait]
impl UpstreamClient for InMemoryUpstream {
    async fn fetch_executions(&self, filters: &QueryFilters) -> Result<Vec<ExecutionRecord>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(UpstreamError::Exhausted {
                attempts: 3,
                reason: "scripted outage".to_owned(),
            });
        }
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|record| matches_filters(record, filters))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use runsight_protocol::{TestStatus, TimeRange};

    fn record(test_id: &str, platform: &str, status: TestStatus) -> ExecutionRecord {
        ExecutionRecord {
            test_id: test_id.to_owned(),
            test_name: test_id.to_owned(),
            run_id: "run-1".to_owned(),
            status,
            duration_ms: Some(1000),
            platform: Some(platform.to_owned()),
            owner: None,
            timestamp: Utc::now() - Duration::hours(1),
            error_signature: None,
        }
    }

    #[tokio::test]
    async fn filters_apply_locally() {
        let upstream = InMemoryUpstream::new(vec![
            record("t1", "aws", TestStatus::Passed),
            record("t2", "gcp", TestStatus::Failed),
        ]);
        let filters = QueryFilters {
            platform: Some("aws".to_owned()),
            time_range: Some(TimeRange::days_back(7, Utc::now())),
            ..Default::default()
        };
        let got = upstream.fetch_executions(&filters).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].test_id, "t1");
        assert_eq!(upstream.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scripted_outage_fails_then_recovers() {
        let upstream = InMemoryUpstream::new(vec![record("t1", "aws", TestStatus::Passed)]);
        upstream.fail_next(1);
        let filters = QueryFilters::default();
        assert!(upstream.fetch_executions(&filters).await.is_err());
        assert!(upstream.fetch_executions(&filters).await.is_ok());
    }
}
