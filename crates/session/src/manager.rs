use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use runsight_protocol::SessionContext;

use crate::state::{SessionState, Turn};

/// Guard proving the holder owns the session's current turn.
///
/// Turns for one session are strictly sequential: a second turn queues on
/// the same gate until the first finishes its interpret + compose cycle.
/// Independent sessions impose no ordering on each other.
pub type TurnGuard = tokio::sync::OwnedMutexGuard<()>;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub idle_timeout: Duration,
    pub max_history: usize,
    /// When set, sessions are saved as JSON under this directory and
    /// reloaded on first access after a restart.
    pub persist_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30 * 60),
            max_history: 50,
            persist_dir: None,
        }
    }
}

struct Slot {
    turn_gate: Arc<tokio::sync::Mutex<()>>,
    state: Arc<Mutex<SessionState>>,
}

/// Holds per-conversation context across turns.
pub struct SessionManager {
    slots: Mutex<HashMap<String, Slot>>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn create_session(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.ensure_slot(&id);
        log::info!("Created session {id}");
        id
    }

    fn session_path(&self, id: &str) -> Option<PathBuf> {
        // Session ids we mint are uuids; reject anything path-like that a
        // caller might hand us before it touches the filesystem.
        if id.contains(['/', '\\', '.']) {
            return None;
        }
        self.config.persist_dir.as_ref().map(|dir| dir.join(format!("{id}.json")))
    }

    fn load_persisted(&self, id: &str) -> Option<SessionState> {
        let path = self.session_path(id)?;
        let bytes = std::fs::read(&path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(state) => Some(state),
            Err(err) => {
                log::warn!("Corrupt session file {}: {err}", path.display());
                let _ = std::fs::remove_file(&path);
                None
            }
        }
    }

    fn save(&self, state: &SessionState) {
        let Some(path) = self.session_path(&state.id) else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_vec(state) {
            Ok(bytes) => {
                if let Err(err) = std::fs::write(&path, bytes) {
                    log::warn!("Failed to persist session {}: {err}", state.id);
                }
            }
            Err(err) => log::warn!("Failed to serialize session {}: {err}", state.id),
        }
    }

    fn ensure_slot(&self, id: &str) -> (Arc<tokio::sync::Mutex<()>>, Arc<Mutex<SessionState>>) {
        let mut slots = self.slots.lock().expect("session mutex poisoned");
        let slot = slots.entry(id.to_owned()).or_insert_with(|| {
            let state = self
                .load_persisted(id)
                .unwrap_or_else(|| SessionState::new(id));
            Slot {
                turn_gate: Arc::new(tokio::sync::Mutex::new(())),
                state: Arc::new(Mutex::new(state)),
            }
        });
        (Arc::clone(&slot.turn_gate), Arc::clone(&slot.state))
    }

    /// Acquire the session's turn gate; resolves once prior turns finished.
    pub async fn begin_turn(&self, id: &str) -> TurnGuard {
        let (gate, _) = self.ensure_slot(id);
        gate.lock_owned().await
    }

    pub fn context(&self, id: &str) -> SessionContext {
        let (_, state) = self.ensure_slot(id);
        let state = state.lock().expect("session state poisoned");
        state.context()
    }

    pub fn record_turn(&self, id: &str, turn: Turn) {
        let (_, state) = self.ensure_slot(id);
        let mut state = state.lock().expect("session state poisoned");
        state.push_turn(turn, self.config.max_history);
        self.save(&state);
    }

    /// Drop sessions idle past the timeout.
    ///
    /// Eviction discards conversational context only; cached analyses are
    /// keyed by structured query and survive untouched.
    pub fn evict_idle(&self) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.config.idle_timeout)
                .unwrap_or_else(|_| chrono::Duration::minutes(30));
        let mut slots = self.slots.lock().expect("session mutex poisoned");
        let doomed: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| {
                slot.state
                    .lock()
                    .map(|state| state.last_active < cutoff)
                    .unwrap_or(true)
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in &doomed {
            slots.remove(id);
            if let Some(path) = self.session_path(id) {
                let _ = std::fs::remove_file(path);
            }
            log::info!("Evicted idle session {id}");
        }
        doomed.len()
    }

    pub fn session_count(&self) -> usize {
        self.slots.lock().expect("session mutex poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use runsight_protocol::{Intent, Query, QueryFilters, StructuredQuery};

    fn turn(raw: &str, session: &str) -> Turn {
        Turn {
            query: Query::new(raw, session),
            structured: StructuredQuery::new(Intent::RawCount, QueryFilters::default()),
            result_fingerprint: "fp".to_owned(),
        }
    }

    #[tokio::test]
    async fn context_reflects_recorded_turns() {
        let manager = SessionManager::new(SessionConfig::default());
        let id = manager.create_session();
        assert!(manager.context(&id).last_query.is_none());

        manager.record_turn(&id, turn("how many tests ran?", &id));
        let ctx = manager.context(&id);
        assert_eq!(ctx.last_query.unwrap().intent, Intent::RawCount);
        assert_eq!(ctx.recent_questions, vec!["how many tests ran?".to_owned()]);
    }

    #[tokio::test]
    async fn turns_for_one_session_serialize() {
        let manager = Arc::new(SessionManager::new(SessionConfig::default()));
        let id = manager.create_session();

        let first = manager.begin_turn(&id).await;
        let second = {
            let manager = Arc::clone(&manager);
            let id = id.clone();
            tokio::spawn(async move {
                let _guard = manager.begin_turn(&id).await;
            })
        };
        // The second turn cannot start while the first guard is held.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!second.is_finished());
        drop(first);
        second.await.unwrap();
    }

    #[tokio::test]
    async fn independent_sessions_do_not_block_each_other() {
        let manager = SessionManager::new(SessionConfig::default());
        let a = manager.create_session();
        let b = manager.create_session();
        let _guard_a = manager.begin_turn(&a).await;
        // Completes immediately despite session A's turn being open.
        let _guard_b = manager.begin_turn(&b).await;
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted() {
        let manager = SessionManager::new(SessionConfig {
            idle_timeout: Duration::from_millis(0),
            ..Default::default()
        });
        let id = manager.create_session();
        manager.record_turn(&id, turn("q", &id));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(manager.evict_idle(), 1);
        assert_eq!(manager.session_count(), 0);
    }

    #[tokio::test]
    async fn sessions_persist_across_managers() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig {
            persist_dir: Some(dir.path().to_owned()),
            ..Default::default()
        };
        let id = {
            let manager = SessionManager::new(config.clone());
            let id = manager.create_session();
            manager.record_turn(&id, turn("first question", &id));
            id
        };
        let manager = SessionManager::new(config);
        let ctx = manager.context(&id);
        assert_eq!(ctx.recent_questions, vec!["first question".to_owned()]);
    }

    #[tokio::test]
    async fn history_is_capped() {
        let manager = SessionManager::new(SessionConfig {
            max_history: 2,
            ..Default::default()
        });
        let id = manager.create_session();
        for i in 0..5 {
            manager.record_turn(&id, turn(&format!("q{i}"), &id));
        }
        let ctx = manager.context(&id);
        assert_eq!(ctx.recent_questions, vec!["q3".to_owned(), "q4".to_owned()]);
    }
}
