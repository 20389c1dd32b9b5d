use thiserror::Error;

/// Backend storage failure.
///
/// Store errors never surface to query callers: a failing `get` is treated
/// as a miss and a failing `put` only costs the memoization.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
