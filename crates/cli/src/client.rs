//! API client for the Datadog metrics query endpoint

use anyhow::{Context, Result};
use async_trait::async_trait;
use report_lib::query::{MetricQuery, MetricsSource};
use report_lib::{EntityKey, Point, QueryError, RawSeries};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::config::Credentials;

const QUERY_PATH: &str = "api/v1/query";

/// API client for the Datadog metrics API
pub struct DatadogClient {
    client: Client,
    base_url: Url,
    credentials: Credentials,
    timeout: Duration,
}

impl DatadogClient {
    /// Create a new API client
    pub fn new(base_url: &str, credentials: Credentials, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self {
            client,
            base_url,
            credentials,
            timeout,
        })
    }

    /// Run a raw query string over `[from, to]` (unix seconds)
    pub async fn query_raw(&self, query: &str, from: i64, to: i64) -> Result<QueryResponse, QueryError> {
        let url = self
            .base_url
            .join(QUERY_PATH)
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .header("DD-API-KEY", &self.credentials.api_key)
            .header("DD-APPLICATION-KEY", &self.credentials.app_key)
            .query(&[
                ("from", from.to_string()),
                ("to", to.to_string()),
                ("query", query.to_string()),
            ])
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Backend(format!("API error ({}): {}", status, body)));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| QueryError::Decode(e.to_string()))?;

        if body.status.as_deref() == Some("error") || body.error.is_some() {
            let message = body.error.unwrap_or_else(|| "unknown error".to_string());
            return Err(QueryError::Backend(message));
        }

        Ok(body)
    }

    /// Cluster names that reported CPU usage during the last hour
    pub async fn list_clusters(&self, now: i64) -> Result<Vec<String>, QueryError> {
        let response = self
            .query_raw(CLUSTER_DISCOVERY_QUERY, now - 3600, now)
            .await?;
        Ok(cluster_names(&response.into_series()))
    }

    fn request_error(&self, err: reqwest::Error) -> QueryError {
        if err.is_timeout() {
            QueryError::Timeout(self.timeout)
        } else {
            QueryError::Transport(err.to_string())
        }
    }
}

/// Query used to discover clusters
pub const CLUSTER_DISCOVERY_QUERY: &str = "avg:kubernetes.cpu.usage.total{*} by {kube_cluster_name}";

/// Distinct, sorted cluster names found in a set of series
pub fn cluster_names(series: &[RawSeries]) -> Vec<String> {
    let mut names: Vec<String> = series
        .iter()
        .filter_map(|s| s.key.tag(report_lib::CLUSTER_TAG))
        .map(str::trim)
        .filter(|name| !name.is_empty() && !name.eq_ignore_ascii_case("n/a"))
        .map(str::to_string)
        .collect();
    names.sort();
    names.dedup();
    names
}

#[async_trait]
impl MetricsSource for DatadogClient {
    async fn query(&self, query: &MetricQuery) -> Result<Vec<RawSeries>, QueryError> {
        let response = self
            .query_raw(&query.to_query_string(), query.from_secs, query.to_secs)
            .await?;
        Ok(response.into_series())
    }
}

// API response types

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub series: Vec<SeriesResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeriesResponse {
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub tag_set: Vec<String>,
    #[serde(default)]
    pub pointlist: Vec<(f64, Option<f64>)>,
}

impl QueryResponse {
    pub fn into_series(self) -> Vec<RawSeries> {
        self.series
            .into_iter()
            .map(|s| RawSeries {
                key: EntityKey::new(s.scope, s.tag_set),
                points: s
                    .pointlist
                    .into_iter()
                    .map(|(ts, value)| Point::new(ts as i64, value))
                    .collect(),
            })
            .collect()
    }
}
