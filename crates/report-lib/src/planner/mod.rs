//! Time range planning
//!
//! Validates a requested range against the backend's lookback limits and
//! splits it into contiguous query windows no longer than the chunk size.

mod parse;

pub use parse::{parse_datetime, parse_relative, TimeRangeSpec};

use crate::error::{HumanDuration, RangeError};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

/// Configuration for the range planner
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Longest range that can be requested
    pub max_lookback: Duration,
    /// Slack above `max_lookback` for ranges computed from a moving "now"
    pub rounding_allowance: Duration,
    /// Shortest range that can be requested
    pub min_range: Duration,
    /// Longest single backend query
    pub chunk_size: Duration,
    /// Extension of the final query when the range ends near "now"
    pub ingestion_buffer: Duration,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_lookback: Duration::days(7),
            rounding_allowance: Duration::minutes(1),
            min_range: Duration::minutes(1),
            chunk_size: Duration::hours(24),
            ingestion_buffer: Duration::minutes(5),
        }
    }
}

/// A half-open `[start, end)` range in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// One backend query window
///
/// `start`/`end` are the reported bounds; `query_end` is what gets sent to the
/// backend and may extend past `end` to absorb ingestion lag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueryWindow {
    pub index: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub query_end: DateTime<Utc>,
}

/// Splits requested ranges into query windows
#[derive(Debug, Clone, Default)]
pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Check a range against the configured limits
    pub fn validate(&self, range: &TimeRange) -> Result<(), RangeError> {
        if range.start >= range.end {
            return Err(RangeError::InvalidOrder);
        }

        let requested = range.duration();
        if requested < self.config.min_range {
            return Err(RangeError::TooSmall {
                requested: HumanDuration(requested),
                min: HumanDuration(self.config.min_range),
            });
        }

        if requested > self.config.max_lookback + self.config.rounding_allowance {
            return Err(RangeError::TooLarge {
                requested: HumanDuration(requested),
                max: HumanDuration(self.config.max_lookback),
            });
        }

        Ok(())
    }

    /// Split `range` into ordered, contiguous windows
    pub fn plan(&self, range: &TimeRange, now: DateTime<Utc>) -> Result<Vec<QueryWindow>, RangeError> {
        self.validate(range)?;

        let mut windows = Vec::new();
        let mut cursor = range.start;
        while cursor < range.end {
            let end = (cursor + self.config.chunk_size).min(range.end);
            windows.push(QueryWindow {
                index: windows.len(),
                start: cursor,
                end,
                query_end: end,
            });
            cursor = end;
        }

        if now - range.end <= self.config.ingestion_buffer {
            if let Some(last) = windows.last_mut() {
                last.query_end = last.end + self.config.ingestion_buffer;
            }
        }

        debug!(
            start = %range.start,
            end = %range.end,
            windows = windows.len(),
            "Planned query windows"
        );

        Ok(windows)
    }
}
