//! CLI command implementations

pub mod clusters;
pub mod report;
