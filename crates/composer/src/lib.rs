//! Answer composition: deterministic facts first, model narrative after.

mod facts;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use runsight_llm::{prompt, ModelClient};
use runsight_protocol::{AnalysisResult, StructuredQuery, TextChunk};
use tokio_stream::wrappers::ReceiverStream;

#[derive(Debug, Clone)]
pub struct ComposerConfig {
    /// Upper bound on narrative characters; tokens past it are dropped.
    pub narration_budget_chars: usize,
    pub channel_capacity: usize,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            narration_budget_chars: 1200,
            channel_capacity: 16,
        }
    }
}

/// Streamed answer, facts strictly before narrative.
pub type AnswerStream = ReceiverStream<TextChunk>;

/// Turns an analysis result into a chunk stream.
///
/// Every number in the answer comes from the structured result; the model
/// only narrates facts already sent. Dropping the returned stream stops
/// narration promptly, since the producer halts on the first failed send.
pub struct Composer {
    model: Arc<dyn ModelClient>,
    config: ComposerConfig,
}

impl Composer {
    pub fn new(model: Arc<dyn ModelClient>, config: ComposerConfig) -> Self {
        Self { model, config }
    }

    pub fn compose(
        &self,
        question: &str,
        query: &StructuredQuery,
        result: Arc<AnalysisResult>,
        staleness: Option<Duration>,
    ) -> AnswerStream {
        let (tx, rx) = tokio::sync::mpsc::channel(self.config.channel_capacity);
        let model = Arc::clone(&self.model);
        let budget = self.config.narration_budget_chars;
        let question = question.to_owned();
        let query = query.clone();

        tokio::spawn(async move {
            let mut fact_chunks = facts::render(&query, &result);
            if let Some(age) = staleness {
                fact_chunks.insert(
                    0,
                    TextChunk::fact(format!(
                        "Note: live data is unavailable; answering from results \
                         cached {} ago.",
                        humanize(age)
                    )),
                );
            }
            let fact_block = facts::as_prompt_block(&fact_chunks);
            for chunk in fact_chunks {
                if tx.send(chunk).await.is_err() {
                    return;
                }
            }

            let prompt = prompt::narration(query.intent, &question, &fact_block);
            let mut tokens = match model.complete_streaming(&prompt).await {
                Ok(stream) => stream,
                Err(err) => {
                    log::warn!("Narration unavailable, answering with facts only: {err}");
                    return;
                }
            };
            let mut sent = 0usize;
            while let Some(token) = tokens.next().await {
                let token = match token {
                    Ok(token) => token,
                    Err(err) => {
                        log::warn!("Narration stream interrupted: {err}");
                        return;
                    }
                };
                if sent + token.len() > budget {
                    log::debug!("Narration budget reached after {sent} chars");
                    return;
                }
                sent += token.len();
                if tx.send(TextChunk::narrative(token)).await.is_err() {
                    return;
                }
            }
        });

        ReceiverStream::new(rx)
    }
}

fn humanize(age: Duration) -> String {
    let secs = age.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}
