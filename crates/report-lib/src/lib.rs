//! Report library for Kubernetes pod resource usage
//!
//! This crate provides the core pipeline for:
//! - Planning bounded query windows over a requested time range
//! - Dispatching memory/CPU queries to a metrics backend
//! - Merging chunked series per pod
//! - Reducing series to one row per pod with liveness status
//! - Sorting and summarizing the resulting rows

pub mod dispatcher;
pub mod error;
pub mod merger;
pub mod models;
pub mod naming;
pub mod observability;
pub mod pipeline;
pub mod planner;
pub mod query;
pub mod reducer;
pub mod report;
pub mod sort;

pub use error::{QueryError, RangeError, ReportError};
pub use models::*;
pub use observability::{ReportLogger, ReportMetrics};
pub use pipeline::{PipelineConfig, ReportPipeline, ReportRequest};
pub use report::{EmptyReason, Report, ReportSummary};
pub use sort::SortMode;
