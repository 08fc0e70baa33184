//! Report output and summary statistics

use crate::dispatcher::QueryFailure;
use crate::models::{PodRow, PodStatus};
use crate::planner::{QueryWindow, TimeRange};
use crate::query::QueryFilters;
use crate::sort::SortMode;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why a report has no rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EmptyReason {
    /// The backend returned no memory series for the filters and range
    NoSeries,
    /// Every memory-max query failed
    AnchorUnavailable,
    /// Pods were found but none met the memory threshold
    AllBelowThreshold,
}

impl EmptyReason {
    /// Guidance shown to the user alongside an empty report
    pub fn guidance(&self) -> &'static str {
        match self {
            EmptyReason::NoSeries => {
                "No pods matched. Check the cluster, namespace and pod filters, \
                 or pick a range inside the backend's retention window."
            }
            EmptyReason::AnchorUnavailable => {
                "Memory usage could not be fetched from the backend. \
                 Check the warnings above and try again."
            }
            EmptyReason::AllBelowThreshold => {
                "Pods were found, but none reached the memory threshold. Lower the threshold to see them."
            }
        }
    }
}

/// Summary statistics over the reported rows
///
/// CPU figures only consider rows with a CPU max value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportSummary {
    pub count: usize,
    pub active: usize,
    pub completed: usize,
    pub total_memory_mb: f64,
    pub total_cpu_cores: f64,
    pub memory_min_mb: Option<f64>,
    pub memory_max_mb: Option<f64>,
    pub memory_avg_mb: Option<f64>,
    pub cpu_count: usize,
    pub cpu_min_cores: Option<f64>,
    pub cpu_max_cores: Option<f64>,
    pub cpu_avg_cores: Option<f64>,
}

impl ReportSummary {
    pub fn from_rows(rows: &[PodRow]) -> Self {
        let memory: Vec<f64> = rows.iter().filter_map(|r| r.memory.max).collect();
        let cpu: Vec<f64> = rows.iter().filter_map(|r| r.cpu.max).collect();
        let active = rows
            .iter()
            .filter(|r| r.status == PodStatus::Active)
            .count();

        let (memory_min_mb, memory_max_mb, memory_avg_mb) = min_max_avg(&memory);
        let (cpu_min_cores, cpu_max_cores, cpu_avg_cores) = min_max_avg(&cpu);

        Self {
            count: rows.len(),
            active,
            completed: rows.len() - active,
            total_memory_mb: memory.iter().sum(),
            total_cpu_cores: cpu.iter().sum(),
            memory_min_mb,
            memory_max_mb,
            memory_avg_mb,
            cpu_count: cpu.len(),
            cpu_min_cores,
            cpu_max_cores,
            cpu_avg_cores,
        }
    }
}

fn min_max_avg(values: &[f64]) -> (Option<f64>, Option<f64>, Option<f64>) {
    if values.is_empty() {
        return (None, None, None);
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    (Some(min), Some(max), Some(avg))
}

/// A finished report run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub range: TimeRange,
    pub windows: Vec<QueryWindow>,
    pub filters: QueryFilters,
    pub threshold_mb: f64,
    pub sort: SortMode,
    pub rows: Vec<PodRow>,
    pub failures: Vec<QueryFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_reason: Option<EmptyReason>,
}

impl Report {
    pub fn summary(&self) -> ReportSummary {
        ReportSummary::from_rows(&self.rows)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
