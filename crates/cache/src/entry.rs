use runsight_protocol::{AnalysisResult, NewDataEvent, StructuredQuery};
use serde::{Deserialize, Serialize};

/// One memoized analysis, keyed by query fingerprint.
///
/// Entries are replaced wholesale when superseded, never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub result: AnalysisResult,
    pub created_ms: u64,
    pub ttl_ms: u64,
    /// Retained for overlap checks during invalidation.
    pub source_query: StructuredQuery,
}

impl CacheEntry {
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.created_ms)
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.age_ms(now_ms) >= self.ttl_ms
    }

    /// Whether new upstream data for `event` could change this entry.
    ///
    /// Missing filters widen the entry's scope: an entry with no project
    /// filter spans every project, one with no time filter spans all time.
    pub fn overlaps(&self, event: &NewDataEvent) -> bool {
        let filters = &self.source_query.filters;
        if let Some(project) = &filters.project {
            if project != &event.project {
                return false;
            }
        }
        match &filters.time_range {
            Some(range) => range.overlaps(&event.window),
            None => true,
        }
    }
}
