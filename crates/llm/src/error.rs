use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid model response: {0}")]
    InvalidResponse(String),

    #[error("streaming error: {0}")]
    Streaming(String),

    #[error("model adapter not configured: {0}")]
    Configuration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ModelError> for runsight_protocol::InsightError {
    fn from(err: ModelError) -> Self {
        runsight_protocol::InsightError::UpstreamUnavailable {
            attempts: 1,
            reason: format!("model adapter: {err}"),
        }
    }
}
