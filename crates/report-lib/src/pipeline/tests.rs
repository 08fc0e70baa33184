//! End-to-end tests for the report pipeline
//!
//! These tests run the full pipeline against an in-memory metrics source
//! that serves scripted series and can fail selected queries.

use super::*;
use crate::error::{QueryError, RangeError};
use crate::models::{EntityKey, Point, PodStatus, RawSeries};
use crate::query::MetricQuery;
use async_trait::async_trait;
use chrono::{Duration, TimeZone};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

const MB: f64 = 1024.0 * 1024.0;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 6, 12, 0, 0).unwrap()
}

fn key(namespace: &str, pod: &str) -> EntityKey {
    EntityKey::new(
        format!("kube_namespace:{},pod_name:{}", namespace, pod),
        [
            "kube_cluster_name:prod".to_string(),
            format!("kube_namespace:{}", namespace),
            format!("pod_name:{}", pod),
        ],
    )
}

/// Serves scripted series, returning only points inside the queried window
#[derive(Default)]
struct FakeSource {
    series: HashMap<String, Vec<RawSeries>>,
    failing: HashSet<String>,
    calls: Mutex<Vec<MetricQuery>>,
}

impl FakeSource {
    fn with_series(mut self, metric: LogicalMetric, key: EntityKey, points: Vec<(i64, Option<f64>)>) -> Self {
        self.series.entry(Self::id(metric)).or_default().push(RawSeries {
            key,
            points: points.into_iter().map(|(t, v)| Point::new(t, v)).collect(),
        });
        self
    }

    fn failing(mut self, metric: LogicalMetric) -> Self {
        self.failing.insert(Self::id(metric));
        self
    }

    fn id(metric: LogicalMetric) -> String {
        format!("{}:{}", metric.aggregation().as_str(), metric.backend_metric())
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl MetricsSource for FakeSource {
    async fn query(&self, query: &MetricQuery) -> Result<Vec<RawSeries>, QueryError> {
        self.calls.lock().unwrap().push(query.clone());

        let id = format!("{}:{}", query.aggregation.as_str(), query.metric);
        if self.failing.contains(&id) {
            return Err(QueryError::Backend("403 Forbidden".to_string()));
        }

        let from_ms = query.from_secs * 1000;
        let to_ms = query.to_secs * 1000;
        let series = self
            .series
            .get(&id)
            .map(|all| {
                all.iter()
                    .map(|s| RawSeries {
                        key: s.key.clone(),
                        points: s
                            .points
                            .iter()
                            .filter(|p| p.timestamp_ms >= from_ms && p.timestamp_ms <= to_ms)
                            .copied()
                            .collect(),
                    })
                    .filter(|s| !s.points.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Ok(series)
    }
}

fn ago(d: Duration) -> i64 {
    (now() - d).timestamp_millis()
}

fn request(since: Duration) -> ReportRequest {
    ReportRequest {
        range: TimeRangeSpec::Relative(since),
        ..Default::default()
    }
}

fn pipeline(source: FakeSource) -> (Arc<FakeSource>, ReportPipeline) {
    let source = Arc::new(source);
    let pipeline = ReportPipeline::new(source.clone(), PipelineConfig::default());
    (source, pipeline)
}

/// Two pods reporting across a two-day range
fn two_pod_source() -> FakeSource {
    let web = key("web", "frontend-7d6cf8d579-x2nds");
    let batch = key("batch", "etl-42");

    FakeSource::default()
        .with_series(
            LogicalMetric::MemoryMax,
            web.clone(),
            vec![
                (ago(Duration::hours(40)), Some(300.0 * MB)),
                (ago(Duration::hours(2)), Some(512.0 * MB)),
                (ago(Duration::minutes(1)), None),
            ],
        )
        .with_series(LogicalMetric::MemoryLimit, web.clone(), vec![(ago(Duration::hours(2)), Some(1024.0 * MB))])
        .with_series(LogicalMetric::CpuMax, web.clone(), vec![(ago(Duration::seconds(20)), Some(2.5e8))])
        .with_series(LogicalMetric::CpuLimit, web.clone(), vec![(ago(Duration::hours(1)), Some(1.0))])
        .with_series(
            LogicalMetric::MemoryMax,
            batch.clone(),
            vec![(ago(Duration::hours(30)), Some(2048.0 * MB))],
        )
        .with_series(LogicalMetric::CpuMax, batch, vec![(ago(Duration::hours(30)), Some(3e9))])
}

#[tokio::test]
async fn test_full_pipeline_two_windows() {
    let (source, pipeline) = pipeline(two_pod_source());
    let report = pipeline.run_at(request(Duration::hours(48)), now()).await.unwrap();

    assert_eq!(report.windows.len(), 2);
    assert_eq!(source.call_count(), 16);
    assert!(report.failures.is_empty());
    assert_eq!(report.empty_reason, None);
    assert_eq!(report.rows.len(), 2);

    // Default sort is memory high to low
    let batch = &report.rows[0];
    assert_eq!(batch.namespace, "batch");
    assert_eq!(batch.base_name, "etl");
    assert_eq!(batch.memory.max, Some(2048.0));
    assert_eq!(batch.cpu.max, Some(3.0));
    assert_eq!(batch.status, PodStatus::Completed);

    let web = &report.rows[1];
    assert_eq!(web.base_name, "frontend");
    assert_eq!(web.memory.max, Some(512.0));
    assert_eq!(web.memory.percent, Some(50.0));
    assert_eq!(web.cpu.max, Some(0.25));
    assert_eq!(web.cpu.percent, Some(25.0));
    assert_eq!(web.status, PodStatus::Active);
}

#[tokio::test]
async fn test_last_window_query_extends_past_now() {
    let (source, pipeline) = pipeline(two_pod_source());
    let report = pipeline.run_at(request(Duration::hours(1)), now()).await.unwrap();

    assert_eq!(report.range.end, now());
    let calls = source.calls.lock().unwrap();
    assert!(calls
        .iter()
        .all(|q| q.to_secs == (now() + Duration::minutes(5)).timestamp()));
}

#[tokio::test]
async fn test_sort_mode_is_applied() {
    let (_, pipeline) = pipeline(two_pod_source());
    let report = pipeline
        .run_at(
            ReportRequest {
                sort: SortMode::MemoryAsc,
                ..request(Duration::hours(48))
            },
            now(),
        )
        .await
        .unwrap();

    let memory: Vec<f64> = report.rows.iter().map(|r| r.memory_max()).collect();
    assert_eq!(memory, vec![512.0, 2048.0]);
}

#[tokio::test]
async fn test_boundary_point_seen_by_both_windows() {
    let boundary = now() - Duration::hours(24);
    let pod = key("web", "api-1");
    let source = FakeSource::default().with_series(
        LogicalMetric::MemoryMax,
        pod,
        vec![(boundary.timestamp_millis(), Some(64.0 * MB))],
    );
    let (source, pipeline) = pipeline(source);
    let report = pipeline.run_at(request(Duration::hours(48)), now()).await.unwrap();

    assert_eq!(source.call_count(), 16);
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].memory.max, Some(64.0));
}

#[tokio::test]
async fn test_failed_metric_degrades_to_missing_field() {
    let (_, pipeline) = pipeline(two_pod_source().failing(LogicalMetric::MemoryLimit));
    let report = pipeline.run_at(request(Duration::hours(48)), now()).await.unwrap();

    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.failures.len(), 2);
    assert!(report
        .failures
        .iter()
        .all(|f| f.metric == LogicalMetric::MemoryLimit && f.reason.contains("403")));
    assert!(report.rows.iter().all(|r| r.memory.limit.is_none()));
    assert!(report.rows.iter().all(|r| r.memory.percent.is_none()));
}

#[tokio::test]
async fn test_anchor_failure_gives_empty_report() {
    let (_, pipeline) = pipeline(two_pod_source().failing(LogicalMetric::MemoryMax));
    let report = pipeline.run_at(request(Duration::hours(6)), now()).await.unwrap();

    assert!(report.is_empty());
    assert_eq!(report.empty_reason, Some(EmptyReason::AnchorUnavailable));
}

#[tokio::test]
async fn test_no_series_gives_empty_report() {
    let (_, pipeline) = pipeline(FakeSource::default());
    let report = pipeline.run_at(request(Duration::hours(6)), now()).await.unwrap();

    assert!(report.is_empty());
    assert_eq!(report.empty_reason, Some(EmptyReason::NoSeries));
    assert_eq!(report.summary().count, 0);
}

#[tokio::test]
async fn test_null_only_memory_is_not_blamed_on_threshold() {
    let source = FakeSource::default().with_series(
        LogicalMetric::MemoryMax,
        key("web", "api-7"),
        vec![(ago(Duration::hours(1)), None)],
    );
    let (_, pipeline) = pipeline(source);
    let report = pipeline.run_at(request(Duration::hours(6)), now()).await.unwrap();

    assert!(report.is_empty());
    assert_eq!(report.empty_reason, Some(EmptyReason::NoSeries));
}

#[tokio::test]
async fn test_threshold_removes_everything() {
    let (_, pipeline) = pipeline(two_pod_source());
    let report = pipeline
        .run_at(
            ReportRequest {
                threshold_mb: 10_000.0,
                ..request(Duration::hours(48))
            },
            now(),
        )
        .await
        .unwrap();

    assert!(report.is_empty());
    assert_eq!(report.empty_reason, Some(EmptyReason::AllBelowThreshold));
}

#[tokio::test]
async fn test_range_errors_halt_before_querying() {
    let (source, pipeline) = pipeline(two_pod_source());

    let err = pipeline.run_at(request(Duration::days(8)), now()).await.unwrap_err();
    assert!(matches!(err, ReportError::Range(RangeError::TooLarge { .. })));

    let err = pipeline.run_at(request(Duration::seconds(30)), now()).await.unwrap_err();
    assert!(matches!(err, ReportError::Range(RangeError::TooSmall { .. })));

    let huge = TimeRangeSpec::from_inputs(Some("1000000000d"), None, None, &now()).unwrap();
    let err = pipeline
        .run_at(
            ReportRequest {
                range: huge,
                ..Default::default()
            },
            now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::Range(RangeError::OutOfBounds(_))));

    assert_eq!(source.call_count(), 0);
}

#[tokio::test]
async fn test_negative_threshold_is_rejected() {
    let (source, pipeline) = pipeline(two_pod_source());
    let err = pipeline
        .run_at(
            ReportRequest {
                threshold_mb: -1.0,
                ..request(Duration::hours(1))
            },
            now(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::Configuration(_)));
    assert_eq!(source.call_count(), 0);
}

#[tokio::test]
async fn test_filters_reach_the_backend() {
    let (source, pipeline) = pipeline(FakeSource::default());
    let filters = QueryFilters {
        cluster: Some("prod".to_string()),
        namespace: None,
        pod_pattern: Some("api-%".to_string()),
    };
    pipeline
        .run_at(
            ReportRequest {
                filters,
                ..request(Duration::hours(1))
            },
            now(),
        )
        .await
        .unwrap();

    let calls = source.calls.lock().unwrap();
    assert_eq!(calls.len(), 8);
    assert!(calls
        .iter()
        .all(|q| q.filter == "{kube_cluster_name:prod,pod_name:api-*}"));
}
