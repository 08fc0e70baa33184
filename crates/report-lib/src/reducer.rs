//! Reduction of merged series to one row per pod
//!
//! Memory max is the anchor metric: only entities with a memory-max series
//! produce rows, and only if their latest memory-max sample meets the threshold.

use crate::merger::MergedSeriesTable;
use crate::models::{EntityKey, LogicalMetric, Point, PodRow, PodStatus, ResourceUsage};
use crate::naming::base_name;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Configuration for the reducer
#[derive(Debug, Clone)]
pub struct ReducerConfig {
    /// A pod is active if its latest CPU sample is younger than this
    pub activity_window: Duration,
    /// Minimum memory max (MB) for a pod to be reported
    pub threshold_mb: f64,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            activity_window: Duration::seconds(60),
            threshold_mb: 0.0,
        }
    }
}

/// Rows produced by a reduction, with counts for empty-report guidance
#[derive(Debug, Clone, Default)]
pub struct Reduction {
    pub rows: Vec<PodRow>,
    /// Entities that had a memory-max series at all
    pub anchored: usize,
    /// Entities whose memory-max series held no usable sample
    pub no_sample: usize,
    /// Entities dropped because memory max was under the threshold
    pub below_threshold: usize,
}

/// The most recent point carrying a usable value
pub fn latest_sample(points: &[Point]) -> Option<Point> {
    points.iter().rev().find(|p| p.sample().is_some()).copied()
}

/// Reduces merged series into pod rows
#[derive(Debug, Clone, Default)]
pub struct Reducer {
    config: ReducerConfig,
}

impl Reducer {
    pub fn new(config: ReducerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReducerConfig {
        &self.config
    }

    /// Reduce every anchored entity, in entity-key order
    pub fn reduce(&self, table: &MergedSeriesTable, now: DateTime<Utc>) -> Reduction {
        let mut keys: Vec<&EntityKey> = table.entities(LogicalMetric::MemoryMax).collect();
        keys.sort();

        let mut reduction = Reduction {
            anchored: keys.len(),
            ..Default::default()
        };

        for key in keys {
            match self.reduce_entity(table, key, now) {
                Some(row) => reduction.rows.push(row),
                None if table
                    .series(LogicalMetric::MemoryMax, key)
                    .and_then(latest_sample)
                    .is_none() =>
                {
                    reduction.no_sample += 1
                }
                None => reduction.below_threshold += 1,
            }
        }

        debug!(
            anchored = reduction.anchored,
            rows = reduction.rows.len(),
            no_sample = reduction.no_sample,
            below_threshold = reduction.below_threshold,
            "Reduced merged series"
        );

        reduction
    }

    /// Build the row for one entity, or `None` if it is filtered out
    pub fn reduce_entity(
        &self,
        table: &MergedSeriesTable,
        key: &EntityKey,
        now: DateTime<Utc>,
    ) -> Option<PodRow> {
        let latest = |metric: LogicalMetric| {
            table
                .series(metric, key)
                .and_then(latest_sample)
        };
        let value = |metric: LogicalMetric| {
            latest(metric)
                .and_then(|p| p.sample())
                .map(|raw| metric.to_display_unit(raw))
        };

        let memory_max = value(LogicalMetric::MemoryMax)?;
        if memory_max < self.config.threshold_mb {
            return None;
        }

        let last_cpu_sample_ms = latest(LogicalMetric::CpuMax).map(|p| p.timestamp_ms);
        let status = self.status(last_cpu_sample_ms, now);

        let memory = ResourceUsage::new(
            Some(memory_max),
            value(LogicalMetric::MemoryAvg),
            value(LogicalMetric::MemoryRequest),
            value(LogicalMetric::MemoryLimit),
        );
        let cpu = ResourceUsage::new(
            value(LogicalMetric::CpuMax),
            value(LogicalMetric::CpuAvg),
            value(LogicalMetric::CpuRequest),
            value(LogicalMetric::CpuLimit),
        );

        let pod = key.pod().to_string();
        Some(PodRow {
            cluster: key.cluster().to_string(),
            namespace: key.namespace().to_string(),
            base_name: base_name(&pod),
            pod,
            memory,
            cpu,
            status,
            last_cpu_sample_ms,
        })
    }

    /// Active iff the latest CPU sample is within the activity window of `now`
    pub fn status(&self, last_cpu_sample_ms: Option<i64>, now: DateTime<Utc>) -> PodStatus {
        match last_cpu_sample_ms {
            Some(ts)
                if now.timestamp_millis().saturating_sub(ts)
                    < self.config.activity_window.num_milliseconds() =>
            {
                PodStatus::Active
            }
            _ => PodStatus::Completed,
        }
    }
}
