use thiserror::Error;

pub type Result<T> = std::result::Result<T, UpstreamError>;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid upstream payload: {0}")]
    Decode(String),

    #[error("invalid filter {field}: {value}")]
    InvalidFilter { field: String, value: String },

    #[error("upstream unavailable after {attempts} attempts: {reason}")]
    Exhausted { attempts: u32, reason: String },
}

impl UpstreamError {
    /// Whether a retry can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            UpstreamError::Http(_) => true,
            UpstreamError::Status { status, .. } => *status >= 500 || *status == 429,
            UpstreamError::Decode(_)
            | UpstreamError::InvalidFilter { .. }
            | UpstreamError::Exhausted { .. } => false,
        }
    }
}

impl From<UpstreamError> for runsight_protocol::InsightError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::InvalidFilter { field, value } => {
                runsight_protocol::InsightError::InvalidFilter { field, value }
            }
            UpstreamError::Exhausted { attempts, reason } => {
                runsight_protocol::InsightError::UpstreamUnavailable { attempts, reason }
            }
            other => runsight_protocol::InsightError::UpstreamUnavailable {
                attempts: 1,
                reason: other.to_string(),
            },
        }
    }
}
