//! HTTP client for a ReportPortal-style launch/item API.

use std::time::Duration;

use async_trait::async_trait;
use runsight_protocol::{ExecutionRecord, QueryFilters};
use serde::Deserialize;

use crate::client::{matches_filters, UpstreamClient};
use crate::error::{Result, UpstreamError};
use crate::normalize::RawTestItem;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct ReportApiConfig {
    pub base_url: String,
    /// Project used when a query does not name one.
    pub default_project: String,
    pub auth_token: String,
    pub timeout: Duration,
    pub page_size: u32,
    /// Most recent launches considered per query; the item fan-out is the
    /// expensive part of a fetch.
    pub max_launches: usize,
    pub retry: RetryPolicy,
}

impl Default for ReportApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_owned(),
            default_project: "default_personal".to_owned(),
            auth_token: String::new(),
            timeout: Duration::from_secs(30),
            page_size: 100,
            max_launches: 10,
            retry: RetryPolicy::default(),
        }
    }
}

pub struct ReportApiClient {
    config: ReportApiConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    number: u32,
    #[serde(rename = "totalPages")]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct PageEnvelope<T> {
    #[serde(default = "Vec::new")]
    content: Vec<T>,
    page: PageMeta,
}

#[derive(Debug, Deserialize)]
struct RawLaunch {
    id: serde_json::Value,
}

impl ReportApiClient {
    pub fn new(config: ReportApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, http })
    }

    async fn get_page<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<PageEnvelope<T>> {
        self.config
            .retry
            .run(|| async {
                let url = format!(
                    "{}/api/v1/{endpoint}",
                    self.config.base_url.trim_end_matches('/')
                );
                let response = self
                    .http
                    .get(&url)
                    .bearer_auth(&self.config.auth_token)
                    .query(params)
                    .send()
                    .await?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(UpstreamError::Status {
                        status: status.as_u16(),
                        body,
                    });
                }
                let envelope = response
                    .json::<PageEnvelope<T>>()
                    .await
                    .map_err(|err| UpstreamError::Decode(err.to_string()))?;
                Ok(envelope)
            })
            .await
    }

    async fn collect_pages<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        mut params: Vec<(String, String)>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1u32;
        loop {
            params.retain(|(key, _)| key != "page.page");
            params.push(("page.page".to_owned(), page.to_string()));
            let envelope: PageEnvelope<T> = self.get_page(endpoint, &params).await?;
            items.extend(envelope.content);
            if envelope.page.number >= envelope.page.total_pages {
                break;
            }
            page += 1;
        }
        Ok(items)
    }

    fn launch_params(&self, filters: &QueryFilters) -> Vec<(String, String)> {
        let mut params = vec![
            ("page.size".to_owned(), self.config.page_size.to_string()),
            ("page.sort".to_owned(), "startTime,DESC".to_owned()),
        ];
        if let Some(range) = &filters.time_range {
            params.push((
                "filter.gte.startTime".to_owned(),
                range.start.timestamp_millis().to_string(),
            ));
            params.push((
                "filter.lt.startTime".to_owned(),
                range.end.timestamp_millis().to_string(),
            ));
        }
        if let Some(platform) = &filters.platform {
            params.push((
                "filter.has.attributes".to_owned(),
                format!("platform:{platform}"),
            ));
        }
        params
    }
}

#[async_trait]
impl UpstreamClient for ReportApiClient {
    async fn fetch_executions(&self, filters: &QueryFilters) -> Result<Vec<ExecutionRecord>> {
        let project = filters
            .project
            .as_deref()
            .unwrap_or(&self.config.default_project);

        let launches: Vec<RawLaunch> = if filters.job_ids.is_empty() {
            self.collect_pages(&format!("{project}/launch"), self.launch_params(filters))
                .await?
        } else {
            filters
                .job_ids
                .iter()
                .map(|id| RawLaunch {
                    id: serde_json::Value::String(id.clone()),
                })
                .collect()
        };

        let mut records = Vec::new();
        for launch in launches.into_iter().take(self.config.max_launches) {
            let launch_id = match &launch.id {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let params = vec![
                ("filter.eq.launchId".to_owned(), launch_id),
                ("page.size".to_owned(), self.config.page_size.to_string()),
            ];
            let items: Vec<RawTestItem> = self
                .collect_pages(&format!("{project}/item"), params)
                .await?;
            for item in items {
                match item.into_record() {
                    Ok(record) => {
                        if matches_filters(&record, filters) {
                            records.push(record);
                        }
                    }
                    // Items mid-execution have no final status yet; skip them.
                    Err(UpstreamError::Decode(reason)) => {
                        log::debug!("Skipping unparseable test item: {reason}");
                    }
                    Err(other) => return Err(other),
                }
            }
        }
        log::info!(
            "Fetched {} execution records for project {project}",
            records.len()
        );
        Ok(records)
    }
}
