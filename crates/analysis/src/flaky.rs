use std::collections::{BTreeMap, BTreeSet};

use runsight_protocol::{ExecutionRecord, TestStatus};

/// Flaky classification thresholds.
#[derive(Debug, Clone, Copy)]
pub struct FlakyConfig {
    /// Minimum distinct runs before a test can be classified at all.
    pub min_runs: usize,
    /// Pass rate must be strictly above this bound.
    pub low_threshold: f64,
    /// Pass rate must be strictly below this bound.
    pub high_threshold: f64,
}

impl Default for FlakyConfig {
    fn default() -> Self {
        Self {
            min_runs: 5,
            low_threshold: 0.1,
            high_threshold: 0.9,
        }
    }
}

/// Flag tests whose pass rate sits strictly between the thresholds.
///
/// Tests with fewer than `min_runs` distinct runs are excluded entirely:
/// insufficient evidence, not a verdict either way. Skipped executions count
/// toward neither passes nor the run total.
pub(crate) fn detect(records: &[ExecutionRecord], config: &FlakyConfig) -> BTreeSet<String> {
    struct Tally {
        runs: BTreeSet<String>,
        passed: BTreeSet<String>,
    }

    let mut per_test: BTreeMap<&str, Tally> = BTreeMap::new();
    for record in records {
        if record.status == TestStatus::Skipped {
            continue;
        }
        let tally = per_test.entry(record.test_id.as_str()).or_insert(Tally {
            runs: BTreeSet::new(),
            passed: BTreeSet::new(),
        });
        tally.runs.insert(record.run_id.clone());
        if record.status == TestStatus::Passed {
            tally.passed.insert(record.run_id.clone());
        }
    }

    per_test
        .into_iter()
        .filter_map(|(test_id, tally)| {
            let total = tally.runs.len();
            if total < config.min_runs {
                return None;
            }
            let pass_rate = tally.passed.len() as f64 / total as f64;
            (pass_rate > config.low_threshold && pass_rate < config.high_threshold)
                .then(|| test_id.to_owned())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn run(test_id: &str, run_id: &str, status: TestStatus) -> ExecutionRecord {
        ExecutionRecord {
            test_id: test_id.to_owned(),
            test_name: test_id.to_owned(),
            run_id: run_id.to_owned(),
            status,
            duration_ms: None,
            platform: None,
            owner: None,
            timestamp: Utc::now(),
            error_signature: None,
        }
    }

    fn series(test_id: &str, outcomes: &[TestStatus]) -> Vec<ExecutionRecord> {
        outcomes
            .iter()
            .enumerate()
            .map(|(i, status)| run(test_id, &format!("r{i}"), *status))
            .collect()
    }

    #[test]
    fn four_passes_one_failure_is_flaky() {
        use TestStatus::{Failed, Passed};
        let records = series("t", &[Passed, Passed, Passed, Passed, Failed]);
        let flagged = detect(&records, &FlakyConfig::default());
        assert!(flagged.contains("t"));
    }

    #[test]
    fn three_runs_is_insufficient_evidence() {
        use TestStatus::{Failed, Passed};
        let records = series("t", &[Passed, Failed, Passed]);
        let flagged = detect(&records, &FlakyConfig::default());
        assert!(flagged.is_empty());
    }

    #[test]
    fn consistent_outcomes_are_not_flaky() {
        use TestStatus::{Failed, Passed};
        let mut records = series("always_green", &[Passed; 6]);
        records.extend(series("always_red", &[Failed; 6]));
        let flagged = detect(&records, &FlakyConfig::default());
        assert!(flagged.is_empty());
    }

    #[test]
    fn duplicate_records_for_one_run_count_once() {
        use TestStatus::{Failed, Passed};
        let mut records = series("t", &[Passed, Passed, Passed, Passed, Failed]);
        // A retry report for an already-seen run must not inflate the total.
        records.push(run("t", "r0", Passed));
        let flagged = detect(&records, &FlakyConfig::default());
        assert!(flagged.contains("t"));
    }

    #[test]
    fn skips_do_not_count_as_runs() {
        use TestStatus::{Passed, Skipped};
        let records = series("t", &[Passed, Passed, Skipped, Skipped, Skipped]);
        // Only two effective runs: below min_runs, excluded.
        let flagged = detect(&records, &FlakyConfig::default());
        assert!(flagged.is_empty());
    }
}
