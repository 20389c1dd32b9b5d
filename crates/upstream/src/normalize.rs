//! Wire payload → [`ExecutionRecord`] normalization.
//!
//! The service reports attributes either as a `{key, value}` list or a plain
//! map depending on endpoint version; both are folded into one shape here.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use runsight_protocol::{ExecutionRecord, TestStatus};
use serde::Deserialize;

use crate::error::UpstreamError;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawAttributes {
    Pairs(Vec<RawAttributePair>),
    Map(HashMap<String, String>),
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAttributePair {
    pub key: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawIssue {
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTestItem {
    pub id: serde_json::Value,
    pub name: String,
    pub status: String,
    #[serde(rename = "startTime")]
    pub start_time: i64,
    #[serde(rename = "endTime")]
    pub end_time: Option<i64>,
    #[serde(rename = "launchId")]
    pub launch_id: serde_json::Value,
    #[serde(default)]
    pub attributes: Option<RawAttributes>,
    pub issue: Option<RawIssue>,
}

fn id_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn attributes_map(raw: Option<RawAttributes>) -> HashMap<String, String> {
    match raw {
        Some(RawAttributes::Map(map)) => map,
        Some(RawAttributes::Pairs(pairs)) => pairs
            .into_iter()
            .filter_map(|pair| Some((pair.key?, pair.value?)))
            .collect(),
        None => HashMap::new(),
    }
}

impl RawTestItem {
    pub(crate) fn into_record(self) -> Result<ExecutionRecord, UpstreamError> {
        let status = TestStatus::parse(&self.status)
            .ok_or_else(|| UpstreamError::Decode(format!("unknown status {:?}", self.status)))?;
        let timestamp: DateTime<Utc> = DateTime::from_timestamp_millis(self.start_time)
            .ok_or_else(|| {
                UpstreamError::Decode(format!("bad start time {}", self.start_time))
            })?;
        let duration_ms = self
            .end_time
            .and_then(|end| u64::try_from(end - self.start_time).ok());
        let mut attributes = attributes_map(self.attributes);
        let error_signature = match status {
            TestStatus::Failed => self.issue.and_then(|issue| issue.comment),
            _ => None,
        };
        Ok(ExecutionRecord {
            test_id: id_to_string(&self.id),
            test_name: self.name,
            run_id: id_to_string(&self.launch_id),
            status,
            duration_ms,
            platform: attributes.remove("platform"),
            owner: attributes.remove("owner"),
            timestamp,
            error_signature,
        })
    }
}
