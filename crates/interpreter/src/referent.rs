//! Referent resolution against the previous turn.

use runsight_protocol::{QueryFilters, SessionContext};

const TEST_REFERENTS: &[&str] = &["those tests", "these tests", "them", "the same tests"];
const PLATFORM_REFERENTS: &[&str] = &["same platform", "that platform", "there"];
const PROJECT_REFERENTS: &[&str] = &["same project", "that project"];
const WINDOW_REFERENTS: &[&str] = &["same period", "same window", "that week", "then"];

fn mentions(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| text.contains(phrase))
}

/// Fill filters the user referred to implicitly from the last structured
/// query. Explicitly extracted values always win; referents only fill gaps.
pub(crate) fn resolve(filters: &mut QueryFilters, text: &str, ctx: &SessionContext) {
    let Some(last) = &ctx.last_query else {
        return;
    };
    let lowered = text.to_ascii_lowercase();

    if filters.test_name_pattern.is_none()
        && filters.job_ids.is_empty()
        && mentions(&lowered, TEST_REFERENTS)
    {
        filters.test_name_pattern = last.filters.test_name_pattern.clone();
        filters.job_ids = last.filters.job_ids.clone();
        log::debug!("Inherited test referents from previous turn");
    }
    if filters.platform.is_none() && mentions(&lowered, PLATFORM_REFERENTS) {
        filters.platform = last.filters.platform.clone();
    }
    if filters.project.is_none() && mentions(&lowered, PROJECT_REFERENTS) {
        filters.project = last.filters.project.clone();
    }
    if filters.time_range.is_none() && mentions(&lowered, WINDOW_REFERENTS) {
        filters.time_range = last.filters.time_range;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use runsight_protocol::{Intent, StructuredQuery, TimeRange};

    fn ctx() -> SessionContext {
        SessionContext {
            last_query: Some(StructuredQuery::new(
                Intent::FailureAnalysis,
                QueryFilters {
                    platform: Some("aws".to_owned()),
                    test_name_pattern: Some("checkout".to_owned()),
                    time_range: Some(TimeRange::days_back(7, Utc::now())),
                    ..Default::default()
                },
            )),
            recent_questions: vec!["which checkout tests failed on aws?".to_owned()],
        }
    }

    #[test]
    fn referents_inherit_from_last_turn() {
        let mut filters = QueryFilters::default();
        resolve(
            &mut filters,
            "are those tests flaky on the same platform?",
            &ctx(),
        );
        assert_eq!(filters.test_name_pattern.as_deref(), Some("checkout"));
        assert_eq!(filters.platform.as_deref(), Some("aws"));
    }

    #[test]
    fn explicit_values_are_not_overwritten() {
        let mut filters = QueryFilters {
            platform: Some("gcp".to_owned()),
            ..Default::default()
        };
        resolve(&mut filters, "and those tests on that platform?", &ctx());
        assert_eq!(filters.platform.as_deref(), Some("gcp"));
    }

    #[test]
    fn no_context_means_no_resolution() {
        let mut filters = QueryFilters::default();
        resolve(&mut filters, "are those tests flaky?", &SessionContext::default());
        assert_eq!(filters, QueryFilters::default());
    }
}
