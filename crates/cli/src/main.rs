//! Pod Memory Report CLI
//!
//! Reports memory and CPU usage of Kubernetes pods from Datadog metrics,
//! including pods that have already completed.

mod client;
mod commands;
mod config;
mod export;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::report::ReportArgs;
use commands::{clusters, report};
use prometheus::{Encoder, TextEncoder};
use report_lib::{ReportPipeline, SortMode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Pod Memory Report CLI
#[derive(Parser)]
#[command(name = "podmem")]
#[command(author, version, about = "Kubernetes pod memory and CPU usage report", long_about = None)]
pub struct Cli {
    /// Datadog site, e.g. datadoghq.eu (can also be set via DD_SITE env var)
    #[arg(long, env = "DD_SITE", global = true)]
    pub site: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Write Prometheus metrics for the run to this file
    #[arg(long, global = true)]
    pub metrics_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Report pod memory and CPU usage
    Report {
        /// Cluster name
        #[arg(long, short)]
        cluster: Option<String>,

        /// Filter by namespace
        #[arg(long, short)]
        namespace: Option<String>,

        /// Filter by pod name (glob, `*` or `%` as wildcard)
        #[arg(long, short)]
        pod: Option<String>,

        /// Relative time range (e.g., 30m, 6h, 2d, 1w)
        #[arg(long, conflicts_with = "start")]
        since: Option<String>,

        /// Range start (YYYY-MM-DD HH:MM, YYYY-MM-DD, HH:MM or MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// Range end, defaults to now
        #[arg(long, requires = "start")]
        end: Option<String>,

        /// Hide pods whose memory max is below this many MB
        #[arg(long, default_value_t = 0.0)]
        threshold_mb: f64,

        /// Sort order (memory-desc, memory-asc, cpu-desc, cpu-asc, name, namespace)
        #[arg(long, default_value = "memory-desc")]
        sort: SortMode,

        /// Also write the report as CSV to this file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// List clusters that reported metrics in the last hour
    Clusters,
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

fn write_metrics(path: &Path) -> Result<()> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&prometheus::gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    std::fs::write(path, buffer).with_context(|| format!("Failed to write metrics to {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let mut app_config = config::AppConfig::load()?;
    if let Some(site) = cli.site {
        app_config.site = site;
    }
    debug!(site = %app_config.site, "Loaded configuration");

    let credentials = config::Credentials::from_env()?;
    let client = Arc::new(client::DatadogClient::new(
        &app_config.api_url(),
        credentials,
        Duration::from_secs(app_config.query_timeout_secs),
    )?);

    // Execute command
    match cli.command {
        Commands::Report {
            cluster,
            namespace,
            pod,
            since,
            start,
            end,
            threshold_mb,
            sort,
            output,
        } => {
            let pipeline = ReportPipeline::new(client, app_config.pipeline_config());
            let args = ReportArgs {
                cluster,
                namespace,
                pod,
                since,
                start,
                end,
                threshold_mb,
                sort,
                output,
            };
            report::run_report(&pipeline, args, cli.format).await?;
        }
        Commands::Clusters => {
            clusters::list_clusters(&client, cli.format).await?;
        }
    }

    if let Some(path) = &cli.metrics_file {
        write_metrics(path)?;
    }

    Ok(())
}
