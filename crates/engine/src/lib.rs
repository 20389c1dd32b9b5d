//! Orchestration: one entry point wiring interpretation, caching, upstream
//! fetch, analysis, composition, and session bookkeeping.

mod config;

pub use config::{ConfigError, RunsightConfig};

use std::sync::Arc;
use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;

use runsight_analysis::{analyze, AnalysisConfig, OwnerResolver, StaticOwnerMap};
use runsight_cache::{CacheStore, DiskStore, ExecutionCache, MemoryStore, TtlPolicy};
use runsight_composer::{Composer, ComposerConfig};
use runsight_interpreter::{Interpretation, InterpreterConfig, QueryInterpreter};
use runsight_llm::{ModelClient, OpenAiClient};
use runsight_protocol::{
    ClarificationRequest, InsightError, NewDataEvent, Query, Result, TextChunk,
};
use runsight_session::{SessionConfig, SessionManager, Turn};
use runsight_upstream::{ReportApiClient, UpstreamClient};

/// Streamed answer chunks; ends when the answer is complete.
pub type AnswerStream = BoxStream<'static, TextChunk>;

/// Outcome of a submitted question.
pub enum Answer {
    /// Fact chunks followed by narrative chunks.
    Stream(AnswerStream),
    /// The question could not be translated safely; ask the user and resubmit.
    Clarification(ClarificationRequest),
}

impl std::fmt::Debug for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Answer::Stream(_) => f.write_str("Answer::Stream(..)"),
            Answer::Clarification(request) => {
                f.debug_tuple("Answer::Clarification").field(request).finish()
            }
        }
    }
}

/// Tuning for an engine assembled from parts rather than from a config file.
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub interpreter: InterpreterConfig,
    pub analysis: AnalysisConfig,
    pub ttl: TtlPolicy,
    pub session: SessionConfig,
    pub composer: ComposerConfig,
}

/// The assembled query-answering pipeline.
///
/// Shared-state discipline: the cache is the only cross-session shared
/// mutable state, and all writes to it flow through `get_or_compute`.
/// Sessions serialize their own turns and never touch each other.
pub struct InsightEngine {
    interpreter: QueryInterpreter,
    cache: ExecutionCache,
    upstream: Arc<dyn UpstreamClient>,
    composer: Composer,
    sessions: SessionManager,
    analysis: AnalysisConfig,
    owners: Arc<dyn OwnerResolver>,
}

impl InsightEngine {
    pub fn new(
        upstream: Arc<dyn UpstreamClient>,
        model: Arc<dyn ModelClient>,
        store: Arc<dyn CacheStore>,
        owners: Arc<dyn OwnerResolver>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            interpreter: QueryInterpreter::new(Arc::clone(&model), settings.interpreter),
            cache: ExecutionCache::new(store, settings.ttl),
            composer: Composer::new(model, settings.composer),
            sessions: SessionManager::new(settings.session),
            analysis: settings.analysis,
            upstream,
            owners,
        }
    }

    /// Assemble the production wiring: HTTP upstream, OpenAI-style model,
    /// memory or disk cache per the config.
    pub fn from_config(config: &RunsightConfig) -> Result<Self> {
        let upstream: Arc<dyn UpstreamClient> =
            Arc::new(ReportApiClient::new(config.upstream_config())?);
        let model: Arc<dyn ModelClient> = Arc::new(OpenAiClient::new(config.model_config())?);
        let store: Arc<dyn CacheStore> = match &config.cache.directory {
            Some(dir) => Arc::new(
                DiskStore::new(dir).map_err(|err| InsightError::Other(err.to_string()))?,
            ),
            None => Arc::new(MemoryStore::new(config.cache.capacity)),
        };
        Ok(Self::new(
            upstream,
            model,
            store,
            Arc::new(StaticOwnerMap::default()),
            EngineSettings {
                interpreter: config.interpreter_config(),
                analysis: AnalysisConfig::default(),
                ttl: config.ttl_policy(),
                session: config.session_config(),
                composer: config.composer_config(),
            },
        ))
    }

    pub fn create_session(&self) -> String {
        self.sessions.create_session()
    }

    /// Answer one natural-language question within a session.
    ///
    /// Turns of the same session run strictly in submission order; the
    /// session's turn stays open until the returned stream is fully consumed
    /// or dropped.
    pub async fn submit_query(&self, session_id: &str, text: &str) -> Result<Answer> {
        self.sessions.evict_idle();
        let guard = self.sessions.begin_turn(session_id).await;
        let ctx = self.sessions.context(session_id);

        let structured = match self
            .interpreter
            .interpret(text, &ctx)
            .await
            .map_err(InsightError::from)?
        {
            Interpretation::Query(query) => query,
            Interpretation::Clarification(request) => {
                log::info!("Clarification needed for session {session_id}");
                return Ok(Answer::Clarification(request));
            }
        };

        let upstream = Arc::clone(&self.upstream);
        let owners = Arc::clone(&self.owners);
        let analysis_config = self.analysis.clone();
        let query_for_compute = structured.clone();
        let computed = self
            .cache
            .get_or_compute(&structured, || async move {
                let records = upstream
                    .fetch_executions(&query_for_compute.filters)
                    .await
                    .map_err(InsightError::from)?;
                Ok(analyze(
                    &records,
                    &query_for_compute,
                    &analysis_config,
                    owners.as_ref(),
                ))
            })
            .await;

        let (result, staleness) = match computed {
            Ok(result) => (result, None),
            Err(err @ InsightError::UpstreamUnavailable { .. }) => {
                match self.cache.lookup_stale(&structured).await {
                    Some((result, age_ms)) => {
                        log::warn!("Upstream down, serving stale result ({age_ms} ms old): {err}");
                        (result, Some(Duration::from_millis(age_ms)))
                    }
                    None => return Err(err),
                }
            }
            Err(err) => return Err(err),
        };

        self.sessions.record_turn(
            session_id,
            Turn {
                query: Query::new(text, session_id),
                structured: structured.clone(),
                result_fingerprint: structured.fingerprint(),
            },
        );

        let stream = self
            .composer
            .compose(text, &structured, result, staleness)
            .map(move |chunk| {
                // Keeps the turn guard alive until the stream is done.
                let _ = &guard;
                chunk
            })
            .boxed();
        Ok(Answer::Stream(stream))
    }

    /// Push notification that new execution data landed upstream. Evicts
    /// every cache entry whose scope overlaps the event; best-effort, TTLs
    /// bound staleness when events are missed.
    pub async fn on_new_data(&self, event: &NewDataEvent) -> usize {
        self.cache.invalidate(event).await
    }
}
