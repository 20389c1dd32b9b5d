mod cluster;
mod flaky;
mod ownership;
mod stats;

use runsight_protocol::{AnalysisResult, ExecutionRecord, StructuredQuery};

pub use cluster::normalize_signature;
pub use flaky::FlakyConfig;
pub use ownership::{OwnerResolver, StaticOwnerMap};

/// Analysis tuning knobs.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub flaky: FlakyConfig,
    /// Minimum token-overlap ratio for two failure signatures to merge into
    /// one cluster.
    pub cluster_similarity: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            flaky: FlakyConfig::default(),
            cluster_similarity: 0.6,
        }
    }
}

/// Compute derived analytics over a record set.
///
/// Pure function of its inputs: identical records and configuration yield an
/// identical result regardless of record order, which is what allows results
/// to be cached by query fingerprint.
pub fn analyze(
    records: &[ExecutionRecord],
    query: &StructuredQuery,
    config: &AnalysisConfig,
    owners: &dyn OwnerResolver,
) -> AnalysisResult {
    log::debug!(
        "Analyzing {} records for intent {}",
        records.len(),
        query.intent.as_str()
    );
    AnalysisResult {
        flaky_tests: flaky::detect(records, &config.flaky),
        clusters: cluster::cluster_failures(records, config.cluster_similarity),
        ownership: ownership::attribute(records, owners),
        stats: stats::summarize(records),
    }
}
