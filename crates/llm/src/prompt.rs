//! Prompt construction for classification and narration.

use runsight_protocol::Intent;

/// System + user message pair sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

const SYSTEM: &str = "You are an assistant for analyzing software test execution data. \
You help users understand test results, identify patterns, and explain test stability \
and failures. Be specific and data-driven; never invent test names or numbers.";

const CLASSIFY_SYSTEM: &str = "You translate questions about test execution history into a \
JSON object {\"intent\": one of [\"failure_analysis\", \"flaky_detection\", \
\"ownership_lookup\", \"trend\", \"raw_count\"], \"filters\": object with optional keys \
\"project\", \"platform\", \"status\", \"days_back\", \"test_name_pattern\", \"owner\", \
\"confidence\": number in [0,1]}. Respond with the JSON object only.";

/// Prompt asking the model to classify a question.
pub fn classification(text: &str, context: Option<&str>) -> Prompt {
    let user = match context {
        Some(ctx) => format!("Previous query context:\n{ctx}\n\nQuestion: {text}"),
        None => format!("Question: {text}"),
    };
    Prompt {
        system: CLASSIFY_SYSTEM.to_owned(),
        user,
    }
}

/// Prompt asking the model to narrate already-computed analytics.
///
/// `facts` is the rendered structured data; the model explains, it does not
/// recompute.
pub fn narration(intent: Intent, question: &str, facts: &str) -> Prompt {
    let instruction = match intent {
        Intent::FlakyDetection => {
            "Explain which tests are flaky, their failure patterns, and likely causes. \
             A flaky test both passes and fails across runs without a code change."
        }
        Intent::FailureAnalysis => {
            "Explain the failure clusters: what the grouped error signatures suggest and \
             which tests are affected."
        }
        Intent::OwnershipLookup => {
            "Summarize who owns the listed tests and call out tests with unknown ownership."
        }
        Intent::Trend => {
            "Describe how results develop over the window: stability, platform differences, \
             notable shifts."
        }
        Intent::RawCount => "State the counts plainly and note anything unusual about them.",
    };
    Prompt {
        system: SYSTEM.to_owned(),
        user: format!(
            "Analyzed test execution data:\n{facts}\n\nUser question: {question}\n\n{instruction}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_includes_context_when_present() {
        let p = classification("and on gcp?", Some("intent=flaky_detection platform=aws"));
        assert!(p.user.contains("platform=aws"));
        assert!(p.user.contains("and on gcp?"));
        assert!(p.system.contains("flaky_detection"));
    }

    #[test]
    fn narration_embeds_facts_verbatim() {
        let p = narration(Intent::FlakyDetection, "any flaky tests?", "flaky: test_login");
        assert!(p.user.contains("flaky: test_login"));
        assert!(p.user.contains("any flaky tests?"));
    }
}
