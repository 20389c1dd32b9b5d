use thiserror::Error;

pub type Result<T> = std::result::Result<T, InterpretError>;

#[derive(Error, Debug)]
pub enum InterpretError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid filter {field}: {value}")]
    InvalidFilter { field: String, value: String },

    #[error("could not translate the question (confidence {confidence:.2})")]
    Ambiguous { confidence: f32 },

    #[error("model adapter error: {0}")]
    Model(#[from] runsight_llm::ModelError),
}

impl From<InterpretError> for runsight_protocol::InsightError {
    fn from(err: InterpretError) -> Self {
        match err {
            InterpretError::InvalidQuery(reason) => {
                runsight_protocol::InsightError::invalid_filter("query", reason)
            }
            InterpretError::InvalidFilter { field, value } => {
                runsight_protocol::InsightError::InvalidFilter { field, value }
            }
            InterpretError::Ambiguous { confidence } => {
                runsight_protocol::InsightError::TranslationAmbiguous { confidence }
            }
            InterpretError::Model(err) => err.into(),
        }
    }
}
