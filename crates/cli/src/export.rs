//! CSV export of a finished report

use anyhow::{Context, Result};
use report_lib::{PodRow, Report};
use std::fmt::Write as _;
use std::path::Path;

const COLUMNS: [&str; 12] = [
    "Namespace",
    "Pod Name",
    "Memory Max (MB)",
    "Memory Avg (MB)",
    "Memory Request (MB)",
    "Memory Limit (MB)",
    "Memory Utilization (%)",
    "CPU Max (cores)",
    "CPU Avg (cores)",
    "CPU Request (cores)",
    "CPU Limit (cores)",
    "CPU Utilization (%)",
];

/// Write the report as CSV to `path`
pub fn write_csv(report: &Report, path: &Path) -> Result<()> {
    std::fs::write(path, render_csv(report))
        .with_context(|| format!("Failed to write CSV to {}", path.display()))
}

/// Render the metadata block, pod rows and summary block
pub fn render_csv(report: &Report) -> String {
    let mut out = String::new();
    let filters = &report.filters;

    let metadata = [
        ("Report", "Pod Resource Usage".to_string()),
        ("Generated", report.generated_at.to_rfc3339()),
        ("Start", report.range.start.to_rfc3339()),
        ("End", report.range.end.to_rfc3339()),
        ("Cluster", filters.cluster.clone().unwrap_or_else(|| "all".to_string())),
        ("Namespace", filters.namespace.clone().unwrap_or_else(|| "all".to_string())),
        ("Pod Filter", filters.pod_pattern.clone().unwrap_or_else(|| "all".to_string())),
        ("Memory Threshold (MB)", number(Some(report.threshold_mb))),
        ("Sort", report.sort.label().to_string()),
    ];
    for (key, value) in metadata {
        push_record(&mut out, &[format!("# {}", key).as_str(), value.as_str()]);
    }
    out.push('\n');

    push_record(&mut out, &COLUMNS);
    for row in &report.rows {
        push_row(&mut out, row);
    }

    let summary = report.summary();
    out.push('\n');
    let totals = [
        ("Total Pods", summary.count.to_string()),
        ("Active Pods", summary.active.to_string()),
        ("Completed Pods", summary.completed.to_string()),
        ("Total Memory (MB)", number(Some(summary.total_memory_mb))),
        ("Total CPU (cores)", number(Some(summary.total_cpu_cores))),
        ("Memory Min (MB)", number(summary.memory_min_mb)),
        ("Memory Max (MB)", number(summary.memory_max_mb)),
        ("Memory Avg (MB)", number(summary.memory_avg_mb)),
        ("CPU Min (cores)", number(summary.cpu_min_cores)),
        ("CPU Max (cores)", number(summary.cpu_max_cores)),
        ("CPU Avg (cores)", number(summary.cpu_avg_cores)),
    ];
    push_record(&mut out, &["# Summary"]);
    for (key, value) in totals {
        push_record(&mut out, &[format!("# {}", key).as_str(), value.as_str()]);
    }

    out
}

fn push_row(out: &mut String, row: &PodRow) {
    let fields = [
        row.namespace.clone(),
        row.pod.clone(),
        number(row.memory.max),
        number(row.memory.avg),
        number(row.memory.request),
        number(row.memory.limit),
        number(row.memory.percent),
        number(row.cpu.max),
        number(row.cpu.avg),
        number(row.cpu.request),
        number(row.cpu.limit),
        number(row.cpu.percent),
    ];
    let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
    push_record(out, &refs);
}

fn push_record(out: &mut String, fields: &[&str]) {
    let line: Vec<String> = fields.iter().map(|f| escape(f)).collect();
    let _ = writeln!(out, "{}", line.join(","));
}

/// Two decimals, blank when undefined
fn number(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

/// Quote a field when it contains a delimiter, quote or line break
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
