use thiserror::Error;

pub type Result<T> = std::result::Result<T, InsightError>;

/// Caller-facing error taxonomy.
///
/// Every surfaced failure carries enough structure for the caller to decide
/// whether to retry or reformulate. `Clone` is required so singleflight
/// waiters can all observe the same failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InsightError {
    #[error("query too ambiguous to translate (confidence {confidence:.2})")]
    TranslationAmbiguous { confidence: f32 },

    #[error("invalid filter {field}: {value}")]
    InvalidFilter { field: String, value: String },

    #[error("upstream unavailable after {attempts} attempts: {reason}")]
    UpstreamUnavailable { attempts: u32, reason: String },

    #[error("corrupt cache entry for fingerprint {fingerprint}")]
    CacheCorrupt { fingerprint: String },

    #[error("{0}")]
    Other(String),
}

impl InsightError {
    pub fn invalid_filter(field: impl Into<String>, value: impl Into<String>) -> Self {
        InsightError::InvalidFilter {
            field: field.into(),
            value: value.into(),
        }
    }
}
