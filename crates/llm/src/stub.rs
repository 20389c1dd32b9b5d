//! Scripted model adapter for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use runsight_protocol::IntentClassification;

use crate::client::{ModelClient, TokenStream};
use crate::error::{ModelError, Result};
use crate::prompt::Prompt;

/// Deterministic [`ModelClient`] that replays scripted answers.
///
/// Tests drive the interpreter/composer pipeline through this instead of a
/// live model, keeping everything downstream of classification reproducible.
/// Classifications are consumed in script order; the last one sticks for any
/// further calls.
#[derive(Default)]
pub struct ScriptedModel {
    classifications: Mutex<VecDeque<IntentClassification>>,
    narrative_tokens: Mutex<Vec<String>>,
    completion: Mutex<Option<String>>,
    pub classify_calls: AtomicUsize,
    pub complete_calls: AtomicUsize,
    pub stream_calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classification(self, classification: IntentClassification) -> Self {
        self.classifications.lock().unwrap().push_back(classification);
        self
    }

    pub fn with_narrative(self, tokens: &[&str]) -> Self {
        *self.narrative_tokens.lock().unwrap() =
            tokens.iter().map(|t| (*t).to_owned()).collect();
        self
    }

    pub fn with_completion(self, completion: impl Into<String>) -> Self {
        *self.completion.lock().unwrap() = Some(completion.into());
        self
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn complete(&self, _prompt: &Prompt) -> Result<String> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.completion
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ModelError::Configuration("no scripted completion".to_owned()))
    }

    async fn complete_streaming(&self, _prompt: &Prompt) -> Result<TokenStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        let tokens: Vec<Result<String>> = self
            .narrative_tokens
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .map(Ok)
            .collect();
        Ok(Box::pin(futures::stream::iter(tokens)))
    }

    async fn classify_intent(
        &self,
        _text: &str,
        _context: Option<&str>,
    ) -> Result<IntentClassification> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        let mut scripted = self.classifications.lock().unwrap();
        let next = if scripted.len() > 1 {
            scripted.pop_front()
        } else {
            scripted.front().cloned()
        };
        next.ok_or_else(|| ModelError::Configuration("no scripted classification".to_owned()))
    }
}
