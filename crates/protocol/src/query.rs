use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::timerange::TimeRange;
use crate::vocab;

/// One raw user turn, before interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub raw: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

impl Query {
    pub fn new(raw: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            session_id: session_id.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Classified query intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    FailureAnalysis,
    FlakyDetection,
    OwnershipLookup,
    Trend,
    RawCount,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::FailureAnalysis => "failure_analysis",
            Intent::FlakyDetection => "flaky_detection",
            Intent::OwnershipLookup => "ownership_lookup",
            Intent::Trend => "trend",
            Intent::RawCount => "raw_count",
        }
    }

    pub fn parse(s: &str) -> Option<Intent> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "failure_analysis" => Some(Intent::FailureAnalysis),
            "flaky_detection" => Some(Intent::FlakyDetection),
            "ownership_lookup" => Some(Intent::OwnershipLookup),
            "trend" => Some(Intent::Trend),
            "raw_count" => Some(Intent::RawCount),
            _ => None,
        }
    }
}

/// Execution status a query may filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    Passed,
    Failed,
    Skipped,
}

impl StatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::Passed => "passed",
            StatusFilter::Failed => "failed",
            StatusFilter::Skipped => "skipped",
        }
    }
}

/// Semantic filters of a structured query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFilters {
    pub project: Option<String>,
    pub platform: Option<String>,
    pub status: Option<StatusFilter>,
    pub time_range: Option<TimeRange>,
    pub job_ids: Vec<String>,
    pub test_name_pattern: Option<String>,
    pub owner: Option<String>,
}

/// Immutable structured query.
///
/// The canonical form is a pure function of the semantic filters: two
/// phrasings that resolve to the same filters share one fingerprint and
/// therefore one cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredQuery {
    pub intent: Intent,
    pub filters: QueryFilters,
}

impl StructuredQuery {
    pub fn new(intent: Intent, filters: QueryFilters) -> Self {
        Self { intent, filters }.canonicalized()
    }

    /// Canonical form: platform normalized to the fixed vocabulary, job ids
    /// sorted and deduplicated, time bounds truncated to whole seconds,
    /// free-text filters trimmed and lowercased.
    pub fn canonicalized(mut self) -> Self {
        if let Some(platform) = self.filters.platform.take() {
            self.filters.platform = vocab::normalize_platform(&platform)
                .map(str::to_owned)
                .or(Some(platform.trim().to_ascii_lowercase()));
        }
        if let Some(project) = self.filters.project.take() {
            self.filters.project = Some(project.trim().to_owned());
        }
        if let Some(pattern) = self.filters.test_name_pattern.take() {
            self.filters.test_name_pattern = Some(pattern.trim().to_owned());
        }
        if let Some(owner) = self.filters.owner.take() {
            self.filters.owner = Some(owner.trim().to_ascii_lowercase());
        }
        if let Some(range) = self.filters.time_range.take() {
            self.filters.time_range = Some(range.truncated_to_seconds());
        }
        self.filters.job_ids.sort();
        self.filters.job_ids.dedup();
        self
    }

    /// Stable cache key over the canonical filters.
    ///
    /// Fields are written in a fixed order so the fingerprint never depends
    /// on how the filters were assembled.
    pub fn fingerprint(&self) -> String {
        let canon = self.clone().canonicalized();
        let f = &canon.filters;
        let mut hasher = Sha256::new();
        hasher.update(canon.intent.as_str().as_bytes());
        for field in [
            f.project.as_deref().unwrap_or(""),
            f.platform.as_deref().unwrap_or(""),
            f.status.map(|s| s.as_str()).unwrap_or(""),
            f.test_name_pattern.as_deref().unwrap_or(""),
            f.owner.as_deref().unwrap_or(""),
        ] {
            hasher.update([0u8]);
            hasher.update(field.as_bytes());
        }
        if let Some(range) = &f.time_range {
            hasher.update(range.start.timestamp().to_be_bytes());
            hasher.update(range.end.timestamp().to_be_bytes());
        } else {
            hasher.update([0u8]);
        }
        for id in &f.job_ids {
            hasher.update([0u8]);
            hasher.update(id.as_bytes());
        }
        let digest = hasher.finalize();
        let mut out = String::with_capacity(32);
        for byte in &digest[..16] {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }
}
