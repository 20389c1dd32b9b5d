use serde::{Deserialize, Serialize};

use crate::query::Intent;

/// Kind of a composed output chunk.
///
/// All `Fact` chunks precede all `Narrative` chunks in a composed answer, so
/// a caller that truncates the stream still holds complete factual data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Fact,
    Narrative,
}

/// One unit of a streamed answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub kind: ChunkKind,
    pub text: String,
}

impl TextChunk {
    pub fn fact(text: impl Into<String>) -> Self {
        Self {
            kind: ChunkKind::Fact,
            text: text.into(),
        }
    }

    pub fn narrative(text: impl Into<String>) -> Self {
        Self {
            kind: ChunkKind::Narrative,
            text: text.into(),
        }
    }
}

/// Returned instead of a structured query when interpretation cannot safely
/// proceed. Single round trip: the caller reformulates, we never guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationRequest {
    pub question: String,
    /// Filter field that could not be resolved, when one is identifiable.
    pub missing_field: Option<String>,
}

/// Raw classification produced by the model adapter, before vocabulary
/// validation and canonicalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentClassification {
    pub intent: Intent,
    /// Free-form filter values as extracted, keyed by filter field name.
    pub filters: std::collections::BTreeMap<String, String>,
    pub confidence: f32,
}
