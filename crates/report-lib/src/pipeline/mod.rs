//! End-to-end report pipeline
//!
//! Planner -> Dispatcher -> Merger -> Reducer -> Sorter. Only configuration
//! and range errors stop a run; query failures end up in the report.

#[cfg(test)]
mod tests;

use crate::dispatcher::{DispatchConfig, Dispatcher};
use crate::error::ReportError;
use crate::merger::MergedSeriesTable;
use crate::models::LogicalMetric;
use crate::observability::{ReportLogger, ReportMetrics};
use crate::planner::{Planner, PlannerConfig, TimeRangeSpec};
use crate::query::{MetricsSource, QueryFilters};
use crate::reducer::{Reducer, ReducerConfig};
use crate::report::{EmptyReason, Report};
use crate::sort::{sort_rows, SortMode};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Tunables for every stage of the pipeline
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub planner: PlannerConfig,
    pub dispatch: DispatchConfig,
    pub reducer: ReducerConfig,
}

/// What the caller wants reported
#[derive(Debug, Clone, Default)]
pub struct ReportRequest {
    pub range: TimeRangeSpec,
    pub filters: QueryFilters,
    /// Minimum memory max in MB
    pub threshold_mb: f64,
    pub sort: SortMode,
}

/// Runs report requests against a metrics source
pub struct ReportPipeline {
    source: Arc<dyn MetricsSource>,
    config: PipelineConfig,
    metrics: ReportMetrics,
}

impl ReportPipeline {
    pub fn new(source: Arc<dyn MetricsSource>, config: PipelineConfig) -> Self {
        Self {
            source,
            config,
            metrics: ReportMetrics::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self, request: ReportRequest) -> Result<Report, ReportError> {
        self.run_at(request, Utc::now()).await
    }

    /// Run with an explicit "now", used for range resolution and liveness
    pub async fn run_at(&self, request: ReportRequest, now: DateTime<Utc>) -> Result<Report, ReportError> {
        if !request.threshold_mb.is_finite() || request.threshold_mb < 0.0 {
            return Err(ReportError::Configuration(format!(
                "memory threshold must be a non-negative number, got {}",
                request.threshold_mb
            )));
        }

        let planner = Planner::new(self.config.planner.clone());
        let range = request.range.resolve(now)?;
        let windows = planner.plan(&range, now)?;

        let logger = ReportLogger::new(request.filters.cluster.as_deref().unwrap_or("*"));
        logger.log_report_started(
            &range.start.to_rfc3339(),
            &range.end.to_rfc3339(),
            windows.len(),
            &request.filters.to_tag_filter(),
        );

        let dispatcher = Dispatcher::new(
            Arc::clone(&self.source),
            self.config.dispatch.clone(),
            logger.clone(),
        );
        let outcome = dispatcher.dispatch(&windows, &request.filters).await;
        let table = MergedSeriesTable::from_outcome(&outcome);

        let reducer = Reducer::new(ReducerConfig {
            threshold_mb: request.threshold_mb,
            ..self.config.reducer.clone()
        });
        let reduction = reducer.reduce(&table, now);

        let mut rows = reduction.rows;
        sort_rows(&mut rows, request.sort);

        let empty_reason = if !rows.is_empty() {
            None
        } else if table.is_unavailable(LogicalMetric::MemoryMax) {
            Some(EmptyReason::AnchorUnavailable)
        } else if reduction.below_threshold > 0 {
            Some(EmptyReason::AllBelowThreshold)
        } else {
            Some(EmptyReason::NoSeries)
        };

        self.metrics.set_rows_emitted(rows.len() as i64);
        logger.log_report_completed(rows.len(), reduction.anchored, outcome.failures.len());

        Ok(Report {
            generated_at: now,
            range,
            windows,
            filters: request.filters,
            threshold_mb: request.threshold_mb,
            sort: request.sort,
            rows,
            failures: outcome.failures,
            empty_reason,
        })
    }
}
