//! Deterministic, rule-based filter extraction.
//!
//! Runs before the model adapter and supplies defaults the classifier can
//! refine but not contradict silently: anything extracted here came straight
//! from the user's words.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use runsight_protocol::{vocab, StatusFilter, TimeRange};

static LAST_N: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:last|past)\s+(\d{1,3})\s+(day|week|hour)s?\b").expect("static regex")
});
static SINCE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bsince\s+(\d{4}-\d{2}-\d{2})\b").expect("static regex"));
static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)""#).expect("static regex"));
static TEST_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\btest_\w+").expect("static regex"));
static OWNED_BY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bowned\s+by\s+(\w[\w-]*)").expect("static regex"));

/// Round the clock up to the next hour boundary.
///
/// Relative windows anchor here so the same phrasing repeated within the
/// hour produces the same absolute window and therefore the same
/// fingerprint.
pub(crate) fn ceil_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    let hour = ts.timestamp() - ts.timestamp().rem_euclid(3600);
    let floored = DateTime::from_timestamp(hour, 0).unwrap_or(ts);
    if floored == ts {
        floored
    } else {
        floored + Duration::hours(1)
    }
}

fn start_of_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&ts.date_naive().and_time(NaiveTime::MIN))
}

/// Resolve time phrases against the wall clock into an absolute window.
///
/// "Last N days/hours" phrases anchor at the next hour boundary; calendar
/// phrases (`today`, `yesterday`) snap to whole days, so their windows stay
/// stable for the rest of the day.
pub(crate) fn extract_time_range(text: &str, now: DateTime<Utc>) -> Option<TimeRange> {
    let lowered = text.to_ascii_lowercase();
    let anchor = ceil_to_hour(now);
    if let Some(caps) = LAST_N.captures(&lowered) {
        let n: i64 = caps[1].parse().ok()?;
        let days = match &caps[2] {
            "week" => n * 7,
            "hour" => return Some(TimeRange::new(anchor - Duration::hours(n), anchor)),
            _ => n,
        };
        return Some(TimeRange::days_back(days, anchor));
    }
    if let Some(caps) = SINCE_DATE.captures(&lowered) {
        let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
        let start = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?);
        return Some(TimeRange::new(start, anchor));
    }
    if lowered.contains("last week") {
        return Some(TimeRange::days_back(14, anchor));
    }
    if lowered.contains("this week") {
        return Some(TimeRange::days_back(7, anchor));
    }
    if lowered.contains("yesterday") {
        let today = start_of_day(now);
        return Some(TimeRange::new(today - Duration::days(1), today));
    }
    if lowered.contains("today") {
        let today = start_of_day(now);
        return Some(TimeRange::new(today, today + Duration::days(1)));
    }
    None
}

const FAILED_WORDS: &[&str] = &["failed", "failure", "failing", "broken"];
const PASSED_WORDS: &[&str] = &["passed", "passing", "successful", "green"];
const SKIPPED_WORDS: &[&str] = &["skipped", "skip", "ignored"];

pub(crate) fn extract_status(text: &str) -> Option<StatusFilter> {
    let lowered = text.to_ascii_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lowered.contains(w));
    if has(FAILED_WORDS) {
        Some(StatusFilter::Failed)
    } else if has(PASSED_WORDS) {
        Some(StatusFilter::Passed)
    } else if has(SKIPPED_WORDS) {
        Some(StatusFilter::Skipped)
    } else {
        None
    }
}

pub(crate) fn extract_platform(text: &str) -> Option<&'static str> {
    let lowered = text.to_ascii_lowercase();
    lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .find_map(vocab::normalize_platform)
}

/// Quoted names plus bare `test_*` identifiers, deduplicated.
pub(crate) fn extract_test_names(text: &str) -> Vec<String> {
    let mut names: Vec<String> = QUOTED
        .captures_iter(text)
        .map(|caps| caps[1].to_owned())
        .chain(TEST_IDENT.find_iter(text).map(|m| m.as_str().to_owned()))
        .collect();
    names.sort();
    names.dedup();
    names
}

pub(crate) fn extract_owner(text: &str) -> Option<String> {
    OWNED_BY
        .captures(text)
        .map(|caps| caps[1].to_ascii_lowercase())
}
