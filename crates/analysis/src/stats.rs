use std::collections::BTreeSet;

use runsight_protocol::{ExecutionRecord, SummaryStats, TestStatus};

fn status_key(status: TestStatus) -> &'static str {
    match status {
        TestStatus::Passed => "passed",
        TestStatus::Failed => "failed",
        TestStatus::Skipped => "skipped",
    }
}

pub(crate) fn summarize(records: &[ExecutionRecord]) -> SummaryStats {
    let mut stats = SummaryStats {
        total_executions: records.len(),
        ..Default::default()
    };
    if records.is_empty() {
        return stats;
    }

    let mut unique: BTreeSet<&str> = BTreeSet::new();
    let mut failed = 0usize;
    let mut duration_sum = 0u64;
    let mut duration_count = 0usize;

    for record in records {
        unique.insert(record.test_id.as_str());
        *stats
            .status_counts
            .entry(status_key(record.status).to_owned())
            .or_default() += 1;
        let platform = record.platform.as_deref().unwrap_or("unknown");
        *stats.platform_counts.entry(platform.to_owned()).or_default() += 1;
        if record.status == TestStatus::Failed {
            failed += 1;
        }
        if let Some(ms) = record.duration_ms {
            duration_sum += ms;
            duration_count += 1;
        }
        stats.first_seen = Some(match stats.first_seen {
            Some(seen) => seen.min(record.timestamp),
            None => record.timestamp,
        });
        stats.last_seen = Some(match stats.last_seen {
            Some(seen) => seen.max(record.timestamp),
            None => record.timestamp,
        });
    }

    stats.unique_tests = unique.len();
    stats.failure_rate = failed as f64 / records.len() as f64;
    stats.avg_duration_ms =
        (duration_count > 0).then(|| duration_sum as f64 / duration_count as f64);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;

    fn record(test_id: &str, status: TestStatus, hours_ago: i64) -> ExecutionRecord {
        ExecutionRecord {
            test_id: test_id.to_owned(),
            test_name: test_id.to_owned(),
            run_id: "r".to_owned(),
            status,
            duration_ms: Some(2_000),
            platform: Some("aws".to_owned()),
            owner: None,
            timestamp: Utc::now() - Duration::hours(hours_ago),
            error_signature: None,
        }
    }

    #[test]
    fn summarize_counts_and_rates() {
        let records = vec![
            record("t1", TestStatus::Passed, 3),
            record("t1", TestStatus::Failed, 2),
            record("t2", TestStatus::Passed, 1),
            record("t2", TestStatus::Skipped, 4),
        ];
        let stats = summarize(&records);
        assert_eq!(stats.total_executions, 4);
        assert_eq!(stats.unique_tests, 2);
        assert_eq!(stats.status_counts["passed"], 2);
        assert_eq!(stats.status_counts["failed"], 1);
        assert_eq!(stats.failure_rate, 0.25);
        assert_eq!(stats.avg_duration_ms, Some(2_000.0));
        assert_eq!(stats.platform_counts["aws"], 4);
        assert!(stats.first_seen.unwrap() < stats.last_seen.unwrap());
    }

    #[test]
    fn empty_input_yields_empty_summary() {
        let stats = summarize(&[]);
        assert_eq!(stats.total_executions, 0);
        assert_eq!(stats.avg_duration_ms, None);
        assert_eq!(stats.first_seen, None);
    }
}
