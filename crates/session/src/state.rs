use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use runsight_protocol::{Query, SessionContext, StructuredQuery};

/// One completed turn of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub query: Query,
    pub structured: StructuredQuery,
    /// Fingerprint of the analysis the turn was answered from. The result
    /// itself lives in the shared cache, keyed by query, not by session.
    pub result_fingerprint: String,
}

/// Persistent per-conversation state.
///
/// Mutated only by its owning session's turn; the manager serializes turns
/// per session id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub history: Vec<Turn>,
}

impl SessionState {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            last_active: now,
            history: Vec::new(),
        }
    }

    pub fn context(&self) -> SessionContext {
        SessionContext {
            last_query: self.history.last().map(|turn| turn.structured.clone()),
            recent_questions: self
                .history
                .iter()
                .rev()
                .take(5)
                .rev()
                .map(|turn| turn.query.raw.clone())
                .collect(),
        }
    }

    pub fn push_turn(&mut self, turn: Turn, max_history: usize) {
        self.history.push(turn);
        if self.history.len() > max_history {
            let excess = self.history.len() - max_history;
            self.history.drain(..excess);
        }
        self.last_active = Utc::now();
    }
}
