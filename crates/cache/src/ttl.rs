use std::time::Duration;

use runsight_protocol::Intent;

/// Per-intent cache lifetimes.
///
/// Flaky detection is the most time-sensitive intent; raw counts tolerate
/// the longest staleness. Push invalidation is best-effort, so these bounds
/// are the guaranteed staleness ceiling.
#[derive(Debug, Clone, Copy)]
pub struct TtlPolicy {
    pub flaky_detection: Duration,
    pub raw_count: Duration,
    pub default: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            flaky_detection: Duration::from_secs(5 * 60),
            raw_count: Duration::from_secs(60 * 60),
            default: Duration::from_secs(15 * 60),
        }
    }
}

impl TtlPolicy {
    pub fn ttl_for(&self, intent: Intent) -> Duration {
        match intent {
            Intent::FlakyDetection => self.flaky_detection,
            Intent::RawCount => self.raw_count,
            _ => self.default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_counts_outlive_flaky_results() {
        let policy = TtlPolicy::default();
        assert!(policy.ttl_for(Intent::RawCount) > policy.ttl_for(Intent::FlakyDetection));
        assert_eq!(policy.ttl_for(Intent::Trend), policy.default);
    }
}
