//! Merging of per-window series
//!
//! Windows are merged per logical metric into one time-ordered series per
//! entity with at most one point per timestamp. When two points share a
//! timestamp, a non-null value beats a null one; otherwise the point from the
//! earliest-dispatched window (and, within a window, the first occurrence) is kept.

use crate::dispatcher::DispatchOutcome;
use crate::models::{EntityKey, LogicalMetric, Point, SeriesSlice};
use crate::observability::ReportMetrics;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Merged series for one logical metric, keyed by entity
pub type EntitySeries = HashMap<EntityKey, Vec<Point>>;

/// Merge the window slices of one logical metric
///
/// Unavailable slices contribute nothing.
pub fn merge_slices(slices: &[SeriesSlice]) -> EntitySeries {
    let mut merged: EntitySeries = HashMap::new();

    for slice in slices {
        let SeriesSlice::Available(series) = slice else {
            continue;
        };
        for raw in series {
            merged
                .entry(raw.key.clone())
                .or_default()
                .extend_from_slice(&raw.points);
        }
    }

    for points in merged.values_mut() {
        normalize_points(points);
    }

    merged
}

/// Sort points by timestamp and keep one point per timestamp
///
/// The sort is stable, so concatenation order (window order) decides ties.
pub fn normalize_points(points: &mut Vec<Point>) {
    points.sort_by_key(|p| p.timestamp_ms);
    points.dedup_by(|later, kept| {
        if later.timestamp_ms != kept.timestamp_ms {
            return false;
        }
        if kept.sample().is_none() && later.sample().is_some() {
            kept.value = later.value;
        }
        true
    });
}

/// Merged series for every logical metric of a report run
#[derive(Debug, Clone, Default)]
pub struct MergedSeriesTable {
    series: HashMap<LogicalMetric, EntitySeries>,
    unavailable: HashSet<LogicalMetric>,
}

impl MergedSeriesTable {
    pub fn from_outcome(outcome: &DispatchOutcome) -> Self {
        let metrics = ReportMetrics::new();
        let mut table = Self::default();

        for metric in LogicalMetric::ALL {
            let slices = outcome.slices(metric);
            if !slices.is_empty() && !slices.iter().any(SeriesSlice::is_available) {
                table.unavailable.insert(metric);
            }

            let merged = merge_slices(slices);
            let points: usize = merged.values().map(Vec::len).sum();
            debug!(
                metric = %metric,
                entities = merged.len(),
                points = points,
                "Merged query windows"
            );
            metrics.add_merged(merged.len() as u64, points as u64);
            table.series.insert(metric, merged);
        }

        table
    }

    /// Insert an already merged series, normalizing its points
    pub fn insert(&mut self, metric: LogicalMetric, key: EntityKey, mut points: Vec<Point>) {
        normalize_points(&mut points);
        self.series.entry(metric).or_default().insert(key, points);
    }

    pub fn series(&self, metric: LogicalMetric, key: &EntityKey) -> Option<&[Point]> {
        self.series
            .get(&metric)
            .and_then(|entities| entities.get(key))
            .map(Vec::as_slice)
    }

    /// Entities with a series for `metric`
    pub fn entities(&self, metric: LogicalMetric) -> impl Iterator<Item = &EntityKey> {
        self.series.get(&metric).into_iter().flat_map(|e| e.keys())
    }

    /// True when every window of `metric` failed
    pub fn is_unavailable(&self, metric: LogicalMetric) -> bool {
        self.unavailable.contains(&metric)
    }
}
