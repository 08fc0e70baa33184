//! Pod resource usage report command

use anyhow::Result;
use chrono::Local;
use colored::Colorize;
use report_lib::planner::TimeRangeSpec;
use report_lib::query::QueryFilters;
use report_lib::{PodRow, Report, ReportPipeline, ReportRequest, ReportSummary, SortMode};
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;

use crate::export;
use crate::output::{
    color_percent, color_status, format_cores, format_memory, format_optional, print_info,
    print_success, print_warning, OutputFormat,
};

/// Inputs collected from the command line
#[derive(Debug, Clone, Default)]
pub struct ReportArgs {
    pub cluster: Option<String>,
    pub namespace: Option<String>,
    pub pod: Option<String>,
    pub since: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub threshold_mb: f64,
    pub sort: SortMode,
    pub output: Option<PathBuf>,
}

impl ReportArgs {
    /// Build the pipeline request, resolving absolute times in local time
    pub fn to_request(&self) -> Result<ReportRequest> {
        let range = TimeRangeSpec::from_inputs(
            self.since.as_deref(),
            self.start.as_deref(),
            self.end.as_deref(),
            &Local::now(),
        )?;

        Ok(ReportRequest {
            range,
            filters: QueryFilters {
                cluster: self.cluster.clone(),
                namespace: self.namespace.clone(),
                pod_pattern: self.pod.clone(),
            },
            threshold_mb: self.threshold_mb,
            sort: self.sort,
        })
    }
}

/// Row for the pod usage table
#[derive(Tabled)]
struct PodTableRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Pod")]
    pod: String,
    #[tabled(rename = "Mem Max")]
    memory_max: String,
    #[tabled(rename = "Mem Avg")]
    memory_avg: String,
    #[tabled(rename = "Mem Request")]
    memory_request: String,
    #[tabled(rename = "Mem Limit")]
    memory_limit: String,
    #[tabled(rename = "Mem %")]
    memory_percent: String,
    #[tabled(rename = "CPU Max")]
    cpu_max: String,
    #[tabled(rename = "CPU Avg")]
    cpu_avg: String,
    #[tabled(rename = "CPU Request")]
    cpu_request: String,
    #[tabled(rename = "CPU Limit")]
    cpu_limit: String,
    #[tabled(rename = "CPU %")]
    cpu_percent: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&PodRow> for PodTableRow {
    fn from(row: &PodRow) -> Self {
        Self {
            namespace: row.namespace.clone(),
            pod: row.base_name.clone(),
            memory_max: format_optional(row.memory.max, format_memory, "N/A"),
            memory_avg: format_optional(row.memory.avg, format_memory, "N/A"),
            memory_request: format_optional(row.memory.request, format_memory, "No request"),
            memory_limit: format_optional(row.memory.limit, format_memory, "No limit"),
            memory_percent: color_percent(row.memory.percent),
            cpu_max: format_optional(row.cpu.max, format_cores, "N/A"),
            cpu_avg: format_optional(row.cpu.avg, format_cores, "N/A"),
            cpu_request: format_optional(row.cpu.request, format_cores, "No request"),
            cpu_limit: format_optional(row.cpu.limit, format_cores, "No limit"),
            cpu_percent: color_percent(row.cpu.percent),
            status: color_status(row.status),
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a Report,
    summary: ReportSummary,
}

/// Run the report and render it
pub async fn run_report(pipeline: &ReportPipeline, args: ReportArgs, format: OutputFormat) -> Result<()> {
    let request = args.to_request()?;
    let report = pipeline.run(request).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&JsonReport {
                report: &report,
                summary: report.summary(),
            })?;
            println!("{}", json);
        }
        OutputFormat::Table => print_report(&report),
    }

    if let Some(path) = &args.output {
        export::write_csv(&report, path)?;
        if format == OutputFormat::Table {
            print_success(&format!("Report written to {}", path.display()));
        }
    }

    Ok(())
}

fn print_report(report: &Report) {
    let filters = &report.filters;
    let local = |t: chrono::DateTime<chrono::Utc>| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string();

    println!("{}", "Pod Resource Usage (including completed pods)".bold());
    println!("{}", "=".repeat(60));
    println!("Cluster:    {}", filters.cluster.as_deref().unwrap_or("all").cyan());
    println!("Namespace:  {}", filters.namespace.as_deref().unwrap_or("all").cyan());
    println!("Pod filter: {}", filters.pod_pattern.as_deref().unwrap_or("all").cyan());
    println!("Range:      {} to {}", local(report.range.start), local(report.range.end));
    if report.threshold_mb > 0.0 {
        println!("Threshold:  {}", format_memory(report.threshold_mb));
    }
    println!("Sort:       {}", report.sort);
    println!();

    for failure in &report.failures {
        print_warning(&format!(
            "Failed to fetch {} for window {}/{}: {}",
            failure.metric,
            failure.window + 1,
            report.windows.len(),
            failure.reason
        ));
    }

    match report.empty_reason {
        Some(reason) => {
            print_warning("No metrics data found for the specified filters");
            print_info(reason.guidance());
        }
        None => {
            let rows: Vec<PodTableRow> = report.rows.iter().map(PodTableRow::from).collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    print_summary(&report.summary());
}

fn print_summary(summary: &ReportSummary) {
    println!(
        "\nTotal pods shown: {} ({} active, {} completed)",
        summary.count, summary.active, summary.completed
    );
    println!("Total memory usage: {}", format_memory(summary.total_memory_mb));
    println!("Total CPU usage: {}", format_cores(summary.total_cpu_cores));

    if let (Some(min), Some(max), Some(avg)) =
        (summary.memory_min_mb, summary.memory_max_mb, summary.memory_avg_mb)
    {
        println!("\n{}", "Resource Distribution".bold());
        println!("Memory (all pods):");
        println!("  Min: {}", format_memory(min));
        println!("  Max: {}", format_memory(max));
        println!("  Average: {}", format_memory(avg));
    }

    if let (Some(min), Some(max), Some(avg)) =
        (summary.cpu_min_cores, summary.cpu_max_cores, summary.cpu_avg_cores)
    {
        println!("CPU ({} pods with CPU data):", summary.cpu_count);
        println!("  Min: {}", format_cores(min));
        println!("  Max: {}", format_cores(max));
        println!("  Average: {}", format_cores(avg));
    }
}
