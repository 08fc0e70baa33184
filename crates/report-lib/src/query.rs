//! Backend query construction and the metrics source seam

use crate::error::QueryError;
use crate::models::{Aggregation, LogicalMetric, RawSeries, CLUSTER_TAG, NAMESPACE_TAG, POD_TAG};
use crate::planner::QueryWindow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Dimensions every report query is grouped by
pub const GROUP_BY: [&str; 3] = [CLUSTER_TAG, NAMESPACE_TAG, POD_TAG];

/// Optional scoping applied to every query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilters {
    pub cluster: Option<String>,
    pub namespace: Option<String>,
    /// Pod name pattern; `*` and `%` match any run of characters
    pub pod_pattern: Option<String>,
}

impl QueryFilters {
    /// Tag filter expression, e.g. `{kube_cluster_name:prod,pod_name:api-*}`
    pub fn to_tag_filter(&self) -> String {
        let tags: Vec<String> = [
            (CLUSTER_TAG, &self.cluster),
            (NAMESPACE_TAG, &self.namespace),
            (POD_TAG, &self.pod_pattern),
        ]
        .into_iter()
        .filter_map(|(tag, value)| {
            value
                .as_deref()
                .map(normalize_tag_value)
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}:{}", tag, v))
        })
        .collect();

        if tags.is_empty() {
            "{*}".to_string()
        } else {
            format!("{{{}}}", tags.join(","))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_tag_filter() == "{*}"
    }
}

/// Normalize a user-supplied tag value into backend glob syntax
///
/// Values are trimmed and lowercased to match backend tag normalization.
/// `%` is accepted as an alias for `*`, and consecutive wildcards collapse.
pub fn normalize_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.trim().chars() {
        let c = if c == '%' { '*' } else { c.to_ascii_lowercase() };
        if c == '*' && out.ends_with('*') {
            continue;
        }
        out.push(c);
    }
    out
}

/// One request to the metrics backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricQuery {
    pub aggregation: Aggregation,
    pub metric: String,
    pub filter: String,
    pub group_by: Vec<String>,
    pub from_secs: i64,
    pub to_secs: i64,
}

impl MetricQuery {
    pub fn new(
        aggregation: Aggregation,
        metric: impl Into<String>,
        filter: impl Into<String>,
        group_by: &[&str],
        from_secs: i64,
        to_secs: i64,
    ) -> Self {
        Self {
            aggregation,
            metric: metric.into(),
            filter: filter.into(),
            group_by: group_by.iter().map(|s| s.to_string()).collect(),
            from_secs,
            to_secs,
        }
    }

    /// Query for one logical metric over one window
    pub fn for_window(metric: LogicalMetric, filters: &QueryFilters, window: &QueryWindow) -> Self {
        Self::new(
            metric.aggregation(),
            metric.backend_metric(),
            filters.to_tag_filter(),
            &GROUP_BY,
            window.start.timestamp(),
            window.query_end.timestamp(),
        )
    }

    /// Backend query string, e.g. `max:kubernetes.memory.usage{*} by {pod_name}`
    pub fn to_query_string(&self) -> String {
        let mut query = format!("{}:{}{}", self.aggregation.as_str(), self.metric, self.filter);
        if !self.group_by.is_empty() {
            query.push_str(&format!(" by {{{}}}", self.group_by.join(",")));
        }
        query
    }
}

/// External time-series service answering metric queries
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Run one query and return one series per matched entity
    async fn query(&self, query: &MetricQuery) -> Result<Vec<RawSeries>, QueryError>;
}
