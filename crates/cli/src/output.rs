//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use report_lib::PodStatus;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format megabytes, switching to GB from 1024 MB
pub fn format_memory(mb: f64) -> String {
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else {
        format!("{:.1} MB", mb)
    }
}

/// Format cores, switching to millicores below one core
pub fn format_cores(cores: f64) -> String {
    if cores >= 1.0 {
        format!("{:.2} cores", cores)
    } else {
        format!("{:.0} mcores", cores * 1000.0)
    }
}

pub fn format_percent(percent: f64) -> String {
    format!("{:.1}%", percent)
}

/// Format an optional measurement, using `missing` when absent
pub fn format_optional(value: Option<f64>, format: fn(f64) -> String, missing: &str) -> String {
    value.map(format).unwrap_or_else(|| missing.to_string())
}

/// Color a utilisation percentage by how close it is to the limit
pub fn color_percent(percent: Option<f64>) -> String {
    match percent {
        Some(p) if p >= 90.0 => format_percent(p).red().to_string(),
        Some(p) if p >= 70.0 => format_percent(p).yellow().to_string(),
        Some(p) => format_percent(p).green().to_string(),
        None => "N/A".dimmed().to_string(),
    }
}

/// Color pod status
pub fn color_status(status: PodStatus) -> String {
    match status {
        PodStatus::Active => status.as_str().green().to_string(),
        PodStatus::Completed => status.as_str().dimmed().to_string(),
    }
}
