//! Deterministic rendering of analysis results into fact chunks.

use runsight_protocol::{AnalysisResult, Intent, StructuredQuery, TextChunk};

const MAX_LISTED_TESTS: usize = 20;
const MAX_LISTED_CLUSTERS: usize = 10;

/// Render the factual portion of an answer.
///
/// The first chunk is always a headline carrying the primary count for the
/// intent, so a consumer that reads only one chunk still gets the number the
/// question was about.
pub fn render(query: &StructuredQuery, result: &AnalysisResult) -> Vec<TextChunk> {
    let mut chunks = Vec::new();
    match query.intent {
        Intent::FlakyDetection => render_flaky(result, &mut chunks),
        Intent::FailureAnalysis => render_failures(result, &mut chunks),
        Intent::OwnershipLookup => render_ownership(result, &mut chunks),
        Intent::Trend => render_trend(result, &mut chunks),
        Intent::RawCount => render_count(result, &mut chunks),
    }
    if let Some(scope) = describe_scope(query) {
        chunks.push(TextChunk::fact(scope));
    }
    chunks
}

fn render_flaky(result: &AnalysisResult, out: &mut Vec<TextChunk>) {
    let n = result.flaky_tests.len();
    out.push(TextChunk::fact(format!(
        "{n} flaky {} detected in the analyzed window.",
        plural(n, "test", "tests")
    )));
    for test_id in result.flaky_tests.iter().take(MAX_LISTED_TESTS) {
        let owner = result
            .ownership
            .get(test_id)
            .map(String::as_str)
            .unwrap_or("unknown");
        out.push(TextChunk::fact(format!("- {test_id} (owner: {owner})")));
    }
    if n > MAX_LISTED_TESTS {
        out.push(TextChunk::fact(format!(
            "... and {} more.",
            n - MAX_LISTED_TESTS
        )));
    }
}

fn render_failures(result: &AnalysisResult, out: &mut Vec<TextChunk>) {
    let failures: usize = result.clusters.iter().map(|c| c.count).sum();
    out.push(TextChunk::fact(format!(
        "{failures} failing {} across {} distinct failure {}.",
        plural(failures, "execution", "executions"),
        result.clusters.len(),
        plural(result.clusters.len(), "signature", "signatures")
    )));
    for cluster in result.clusters.iter().take(MAX_LISTED_CLUSTERS) {
        out.push(TextChunk::fact(format!(
            "- {} failures, {} affected {}: {}",
            cluster.count,
            cluster.test_ids.len(),
            plural(cluster.test_ids.len(), "test", "tests"),
            cluster.signature
        )));
    }
    if result.clusters.len() > MAX_LISTED_CLUSTERS {
        out.push(TextChunk::fact(format!(
            "... and {} more clusters.",
            result.clusters.len() - MAX_LISTED_CLUSTERS
        )));
    }
}

fn render_ownership(result: &AnalysisResult, out: &mut Vec<TextChunk>) {
    out.push(TextChunk::fact(format!(
        "{} {} matched.",
        result.ownership.len(),
        plural(result.ownership.len(), "test", "tests")
    )));
    for (test_id, owner) in result.ownership.iter().take(MAX_LISTED_TESTS) {
        out.push(TextChunk::fact(format!("- {test_id}: owned by {owner}")));
    }
    if result.ownership.len() > MAX_LISTED_TESTS {
        out.push(TextChunk::fact(format!(
            "... and {} more.",
            result.ownership.len() - MAX_LISTED_TESTS
        )));
    }
}

fn render_trend(result: &AnalysisResult, out: &mut Vec<TextChunk>) {
    let stats = &result.stats;
    out.push(TextChunk::fact(format!(
        "{} executions of {} unique tests, failure rate {:.1}%.",
        stats.total_executions,
        stats.unique_tests,
        stats.failure_rate * 100.0
    )));
    if !stats.platform_counts.is_empty() {
        let breakdown: Vec<String> = stats
            .platform_counts
            .iter()
            .map(|(platform, count)| format!("{platform}: {count}"))
            .collect();
        out.push(TextChunk::fact(format!(
            "By platform: {}.",
            breakdown.join(", ")
        )));
    }
    if let (Some(first), Some(last)) = (stats.first_seen, stats.last_seen) {
        out.push(TextChunk::fact(format!(
            "Data spans {} to {}.",
            first.format("%Y-%m-%d %H:%M"),
            last.format("%Y-%m-%d %H:%M")
        )));
    }
    if let Some(avg) = stats.avg_duration_ms {
        out.push(TextChunk::fact(format!("Average duration {avg:.0} ms.")));
    }
}

fn render_count(result: &AnalysisResult, out: &mut Vec<TextChunk>) {
    let stats = &result.stats;
    out.push(TextChunk::fact(format!(
        "{} {} matched.",
        stats.total_executions,
        plural(stats.total_executions, "execution", "executions")
    )));
    if !stats.status_counts.is_empty() {
        let breakdown: Vec<String> = stats
            .status_counts
            .iter()
            .map(|(status, count)| format!("{status}: {count}"))
            .collect();
        out.push(TextChunk::fact(format!(
            "By status: {}.",
            breakdown.join(", ")
        )));
    }
}

fn describe_scope(query: &StructuredQuery) -> Option<String> {
    let f = &query.filters;
    let mut parts = Vec::new();
    if let Some(project) = &f.project {
        parts.push(format!("project {project}"));
    }
    if let Some(platform) = &f.platform {
        parts.push(format!("platform {platform}"));
    }
    if let Some(status) = f.status {
        parts.push(format!("status {}", status.as_str()));
    }
    if let Some(pattern) = &f.test_name_pattern {
        parts.push(format!("tests matching \"{pattern}\""));
    }
    if let Some(owner) = &f.owner {
        parts.push(format!("owner {owner}"));
    }
    if let Some(range) = &f.time_range {
        parts.push(format!(
            "{} to {}",
            range.start.format("%Y-%m-%d"),
            range.end.format("%Y-%m-%d")
        ));
    }
    if parts.is_empty() {
        None
    } else {
        Some(format!("Scope: {}.", parts.join(", ")))
    }
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}

/// Flatten fact chunks into the text block handed to the narration prompt.
pub fn as_prompt_block(chunks: &[TextChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
