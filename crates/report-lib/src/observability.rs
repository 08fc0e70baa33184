//! Observability infrastructure for report runs
//!
//! Provides:
//! - Prometheus metrics (query latency, query outcomes, merge volume, emitted rows)
//! - Structured event logging with tracing

use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for backend query latency (in seconds)
const QUERY_LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ReportMetricsInner> = OnceLock::new();

struct ReportMetricsInner {
    query_latency_seconds: HistogramVec,
    queries_total: IntCounterVec,
    series_merged: IntCounter,
    points_merged: IntCounter,
    rows_emitted: IntGauge,
}

impl ReportMetricsInner {
    fn new() -> Self {
        Self {
            query_latency_seconds: register_histogram_vec!(
                "podmem_query_latency_seconds",
                "Time spent waiting on backend metric queries",
                &["metric"],
                QUERY_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register query_latency_seconds"),

            queries_total: register_int_counter_vec!(
                "podmem_queries_total",
                "Backend metric queries issued, by logical metric and outcome",
                &["metric", "outcome"]
            )
            .expect("Failed to register queries_total"),

            series_merged: register_int_counter!(
                "podmem_series_merged_total",
                "Entity series produced by merging query windows"
            )
            .expect("Failed to register series_merged"),

            points_merged: register_int_counter!(
                "podmem_points_merged_total",
                "Points kept after timestamp deduplication"
            )
            .expect("Failed to register points_merged"),

            rows_emitted: register_int_gauge!(
                "podmem_rows_emitted",
                "Pod rows in the most recent report"
            )
            .expect("Failed to register rows_emitted"),
        }
    }
}

/// Handle to the process-wide report metrics
///
/// Clones share the same underlying metrics in the default Prometheus registry.
#[derive(Clone)]
pub struct ReportMetrics {
    _private: (),
}

impl Default for ReportMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ReportMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ReportMetricsInner {
        GLOBAL_METRICS.get_or_init(ReportMetricsInner::new)
    }

    /// Record a finished query and its outcome (`ok`, `error`, `timeout`)
    pub fn observe_query(&self, metric: &str, outcome: &str, duration_secs: f64) {
        let inner = self.inner();
        inner
            .query_latency_seconds
            .with_label_values(&[metric])
            .observe(duration_secs);
        inner.queries_total.with_label_values(&[metric, outcome]).inc();
    }

    pub fn add_merged(&self, series: u64, points: u64) {
        self.inner().series_merged.inc_by(series);
        self.inner().points_merged.inc_by(points);
    }

    pub fn set_rows_emitted(&self, rows: i64) {
        self.inner().rows_emitted.set(rows);
    }

    /// Number of queries recorded for a metric and outcome
    pub fn query_count(&self, metric: &str, outcome: &str) -> u64 {
        self.inner()
            .queries_total
            .with_label_values(&[metric, outcome])
            .get()
    }
}

/// Structured logger for report events
#[derive(Clone)]
pub struct ReportLogger {
    cluster: String,
}

impl ReportLogger {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
        }
    }

    pub fn log_report_started(&self, start: &str, end: &str, windows: usize, filter: &str) {
        info!(
            event = "report_started",
            cluster = %self.cluster,
            start = %start,
            end = %end,
            windows = windows,
            filter = %filter,
            "Starting pod resource report"
        );
    }

    pub fn log_query_failure(&self, metric: &str, window: usize, reason: &str) {
        warn!(
            event = "query_failed",
            cluster = %self.cluster,
            metric = %metric,
            window = window,
            reason = %reason,
            "Metric query failed, treating slice as no data"
        );
    }

    pub fn log_report_completed(&self, rows: usize, anchored: usize, failures: usize) {
        if failures == 0 {
            info!(
                event = "report_completed",
                cluster = %self.cluster,
                rows = rows,
                anchored = anchored,
                "Report completed"
            );
        } else {
            warn!(
                event = "report_completed",
                cluster = %self.cluster,
                rows = rows,
                anchored = anchored,
                failures = failures,
                "Report completed with missing data"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_metrics_record() {
        let metrics = ReportMetrics::new();
        let before = metrics.query_count("observability_test", "ok");

        metrics.observe_query("observability_test", "ok", 0.2);
        metrics.add_merged(3, 120);
        metrics.set_rows_emitted(3);

        assert_eq!(metrics.query_count("observability_test", "ok"), before + 1);
    }

    #[test]
    fn test_report_logger_creation() {
        let logger = ReportLogger::new("prod-eu");
        assert_eq!(logger.cluster, "prod-eu");
    }
}
