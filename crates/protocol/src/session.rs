use serde::{Deserialize, Serialize};

use crate::query::StructuredQuery;

/// Explicit, passed-in view of a conversation used during interpretation.
///
/// Context is a value, not ambient state: the interpreter sees exactly what
/// the session manager hands it, which rules out cross-session interference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionContext {
    /// Structured query of the most recent completed turn, used to resolve
    /// referents like "those tests" or "the same platform".
    pub last_query: Option<StructuredQuery>,
    /// Recent raw questions, newest last, for model context.
    pub recent_questions: Vec<String>,
}

impl SessionContext {
    /// Compact rendering handed to the model adapter as classification
    /// context.
    pub fn render(&self) -> Option<String> {
        let last = self.last_query.as_ref()?;
        let mut parts = vec![format!("intent={}", last.intent.as_str())];
        let f = &last.filters;
        if let Some(project) = &f.project {
            parts.push(format!("project={project}"));
        }
        if let Some(platform) = &f.platform {
            parts.push(format!("platform={platform}"));
        }
        if let Some(pattern) = &f.test_name_pattern {
            parts.push(format!("tests~{pattern}"));
        }
        Some(parts.join(" "))
    }
}
