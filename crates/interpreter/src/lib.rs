mod error;
mod extract;
mod referent;
mod validate;

use std::sync::Arc;

use chrono::Utc;
use runsight_llm::ModelClient;
use runsight_protocol::{
    vocab, ClarificationRequest, Intent, QueryFilters, SessionContext, StatusFilter,
    StructuredQuery,
};

pub use error::{InterpretError, Result};

/// Interpretation outcome: either a query safe to execute, or a question
/// back to the user. Never a guess.
#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    Query(StructuredQuery),
    Clarification(ClarificationRequest),
}

#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Classifications below this confidence become clarification requests.
    pub confidence_threshold: f32,
    /// Window applied when the user names no time range.
    pub default_days_back: i64,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            default_days_back: 7,
        }
    }
}

/// Turns natural language plus session context into a structured query.
///
/// Interpretation is pure apart from the model adapter call: the same text,
/// context, and classification always produce the same outcome.
pub struct QueryInterpreter {
    model: Arc<dyn ModelClient>,
    config: InterpreterConfig,
}

impl QueryInterpreter {
    pub fn new(model: Arc<dyn ModelClient>, config: InterpreterConfig) -> Self {
        Self { model, config }
    }

    pub async fn interpret(&self, raw: &str, ctx: &SessionContext) -> Result<Interpretation> {
        let text = validate::validate_raw(raw)?;
        let now = Utc::now();
        // Non-calendar windows anchor at the next hour boundary, so the same
        // phrasing repeated within the hour produces the same absolute window
        // and therefore the same fingerprint.
        let anchor = extract::ceil_to_hour(now);

        let classification = match self.model.classify_intent(text, ctx.render().as_deref()).await
        {
            Ok(classification) => classification,
            // A reply that parses as no classification at all means the
            // question defeated the model, not that the adapter is down.
            Err(runsight_llm::ModelError::InvalidResponse(reason)) => {
                log::debug!("Unclassifiable query: {reason}");
                return Err(InterpretError::Ambiguous { confidence: 0.0 });
            }
            Err(err) => return Err(err.into()),
        };
        log::debug!(
            "Classified {:?} with confidence {:.2}",
            classification.intent,
            classification.confidence
        );

        if classification.confidence < self.config.confidence_threshold {
            return Ok(Interpretation::Clarification(ClarificationRequest {
                question: format!(
                    "I couldn't confidently work out what you're asking about \"{text}\". \
                     Could you rephrase, naming the tests, platform, or time range you mean?"
                ),
                missing_field: None,
            }));
        }

        let mut filters = QueryFilters {
            project: classification.filters.get("project").cloned(),
            platform: None,
            status: extract::extract_status(text),
            time_range: extract::extract_time_range(text, now),
            job_ids: Vec::new(),
            test_name_pattern: None,
            owner: extract::extract_owner(text),
        };

        // Platform: model value validated against the vocabulary, else the
        // rule extraction from the raw words.
        if let Some(platform) = classification.filters.get("platform") {
            let normalized = vocab::normalize_platform(platform).ok_or_else(|| {
                InterpretError::InvalidFilter {
                    field: "platform".to_owned(),
                    value: platform.clone(),
                }
            })?;
            filters.platform = Some(normalized.to_owned());
        } else {
            filters.platform = extract::extract_platform(text).map(str::to_owned);
        }

        if let Some(status) = classification.filters.get("status") {
            filters.status = Some(parse_status(status)?);
        }
        // Flaky detection compares pass and fail outcomes per test; a status
        // filter would hide the very contrast it measures.
        if classification.intent == Intent::FlakyDetection {
            filters.status = None;
        }

        if filters.time_range.is_none() {
            if let Some(days) = classification.filters.get("days_back") {
                let days: i64 = days.parse().map_err(|_| InterpretError::InvalidFilter {
                    field: "days_back".to_owned(),
                    value: days.clone(),
                })?;
                if days <= 0 || days > 365 {
                    return Err(InterpretError::InvalidFilter {
                        field: "days_back".to_owned(),
                        value: days.to_string(),
                    });
                }
                filters.time_range = Some(runsight_protocol::TimeRange::days_back(days, anchor));
            }
        }

        if let Some(pattern) = classification.filters.get("test_name_pattern") {
            filters.test_name_pattern = Some(pattern.clone());
        } else {
            let names = extract::extract_test_names(text);
            filters.test_name_pattern = names.into_iter().next();
        }

        if let Some(owner) = classification.filters.get("owner") {
            filters.owner = Some(owner.trim().to_ascii_lowercase());
        }

        referent::resolve(&mut filters, text, ctx);

        // Ownership lookups need a concrete test scope; everything else can
        // default its window.
        if classification.intent == Intent::OwnershipLookup
            && filters.test_name_pattern.is_none()
            && filters.job_ids.is_empty()
            && filters.owner.is_none()
        {
            return Ok(Interpretation::Clarification(ClarificationRequest {
                question: "Which tests do you want ownership for? Name a test, a pattern, \
                           or an owner to look up."
                    .to_owned(),
                missing_field: Some("test_name_pattern".to_owned()),
            }));
        }
        if filters.time_range.is_none() && classification.intent != Intent::OwnershipLookup {
            filters.time_range = Some(runsight_protocol::TimeRange::days_back(
                self.config.default_days_back,
                anchor,
            ));
        }

        Ok(Interpretation::Query(StructuredQuery::new(
            classification.intent,
            filters,
        )))
    }
}

fn parse_status(raw: &str) -> Result<StatusFilter> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "passed" | "pass" => Ok(StatusFilter::Passed),
        "failed" | "fail" => Ok(StatusFilter::Failed),
        "skipped" | "skip" => Ok(StatusFilter::Skipped),
        other => Err(InterpretError::InvalidFilter {
            field: "status".to_owned(),
            value: other.to_owned(),
        }),
    }
}
