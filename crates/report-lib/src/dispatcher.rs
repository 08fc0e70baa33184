//! Metric query dispatch
//!
//! Issues one backend query per (window, logical metric) pair. A failing or
//! slow query never aborts the run: its slice is marked unavailable and the
//! failure is recorded for the report.

use crate::error::QueryError;
use crate::models::{LogicalMetric, SeriesSlice};
use crate::observability::{ReportLogger, ReportMetrics};
use crate::planner::QueryWindow;
use crate::query::{MetricQuery, MetricsSource, QueryFilters};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

/// Configuration for query dispatch
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Upper bound on a single backend query
    pub query_timeout: Duration,
    /// Queries allowed in flight at once
    pub max_concurrent_queries: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(30),
            max_concurrent_queries: 4,
        }
    }
}

/// A query that produced no data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryFailure {
    pub metric: LogicalMetric,
    pub window: usize,
    pub reason: String,
}

/// Per-metric slices, one per window in window order
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    pub slices: HashMap<LogicalMetric, Vec<SeriesSlice>>,
    pub failures: Vec<QueryFailure>,
}

impl DispatchOutcome {
    pub fn slices(&self, metric: LogicalMetric) -> &[SeriesSlice] {
        self.slices.get(&metric).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Dispatches report queries against a metrics source
pub struct Dispatcher {
    source: Arc<dyn MetricsSource>,
    config: DispatchConfig,
    metrics: ReportMetrics,
    logger: ReportLogger,
}

impl Dispatcher {
    pub fn new(source: Arc<dyn MetricsSource>, config: DispatchConfig, logger: ReportLogger) -> Self {
        Self {
            source,
            config,
            metrics: ReportMetrics::new(),
            logger,
        }
    }

    /// Query every logical metric over every window
    pub async fn dispatch(&self, windows: &[QueryWindow], filters: &QueryFilters) -> DispatchOutcome {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_queries.max(1)));
        let timeout = self.config.query_timeout;
        let mut tasks = JoinSet::new();

        for (position, window) in windows.iter().enumerate() {
            for metric in LogicalMetric::ALL {
                let query = MetricQuery::for_window(metric, filters, window);
                let source = Arc::clone(&self.source);
                let permits = Arc::clone(&permits);

                tasks.spawn(async move {
                    let _permit = permits.acquire_owned().await.ok();
                    let started = Instant::now();
                    let result = match tokio::time::timeout(timeout, source.query(&query)).await {
                        Ok(result) => result,
                        Err(_) => Err(QueryError::Timeout(timeout)),
                    };
                    (metric, position, result, started.elapsed())
                });
            }
        }

        let mut slots: HashMap<LogicalMetric, Vec<Option<SeriesSlice>>> = LogicalMetric::ALL
            .into_iter()
            .map(|metric| (metric, vec![None; windows.len()]))
            .collect();
        let mut failures = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            let (metric, position, result, elapsed) = match joined {
                Ok(done) => done,
                Err(e) => {
                    debug!(error = %e, "Query task did not complete");
                    continue;
                }
            };

            let slice = match result {
                Ok(series) => {
                    self.metrics
                        .observe_query(metric.name(), "ok", elapsed.as_secs_f64());
                    debug!(
                        metric = %metric,
                        window = position,
                        series = series.len(),
                        "Query returned"
                    );
                    SeriesSlice::Available(series)
                }
                Err(e) => {
                    let outcome = match e {
                        QueryError::Timeout(_) => "timeout",
                        _ => "error",
                    };
                    self.metrics
                        .observe_query(metric.name(), outcome, elapsed.as_secs_f64());
                    self.record_failure(&mut failures, metric, position, e.to_string())
                }
            };

            if let Some(slot) = slots.get_mut(&metric).and_then(|s| s.get_mut(position)) {
                *slot = Some(slice);
            }
        }

        let mut slices = HashMap::new();
        for metric in LogicalMetric::ALL {
            let filled = slots.remove(&metric).unwrap_or_default();
            let mut ordered = Vec::with_capacity(filled.len());
            for (position, slot) in filled.into_iter().enumerate() {
                let slice = match slot {
                    Some(slice) => slice,
                    None => self.record_failure(
                        &mut failures,
                        metric,
                        position,
                        "query task aborted".to_string(),
                    ),
                };
                ordered.push(slice);
            }
            slices.insert(metric, ordered);
        }

        failures.sort_by_key(|f| (f.window, f.metric));
        DispatchOutcome { slices, failures }
    }

    fn record_failure(
        &self,
        failures: &mut Vec<QueryFailure>,
        metric: LogicalMetric,
        window: usize,
        reason: String,
    ) -> SeriesSlice {
        self.logger.log_query_failure(metric.name(), window, &reason);
        failures.push(QueryFailure {
            metric,
            window,
            reason: reason.clone(),
        });
        SeriesSlice::Unavailable { reason }
    }
}
