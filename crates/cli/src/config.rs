//! Configuration management for the CLI
//!
//! Settings are layered: built-in defaults, then the optional JSON file at
//! `~/.config/podmem/config.json`, then `PODMEM_*` environment variables.
//! Credentials are read from the standard Datadog variables only.

use anyhow::{Context, Result};
use chrono::Duration;
use report_lib::dispatcher::DispatchConfig;
use report_lib::planner::PlannerConfig;
use report_lib::reducer::ReducerConfig;
use report_lib::PipelineConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable holding the Datadog API key
pub const API_KEY_VAR: &str = "DD_API_KEY";
/// Environment variable holding the Datadog application key
pub const APP_KEY_VAR: &str = "DD_APP_KEY";

/// CLI configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Datadog site, e.g. `datadoghq.com` or `datadoghq.eu`
    #[serde(default = "default_site")]
    pub site: String,

    /// Timeout for a single backend query in seconds
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,

    /// Backend queries allowed in flight at once
    #[serde(default = "default_max_concurrent_queries")]
    pub max_concurrent_queries: usize,

    /// A pod counts as active if it reported CPU within this many seconds
    #[serde(default = "default_activity_window")]
    pub activity_window_secs: i64,

    /// Longest range that can be requested, in days
    #[serde(default = "default_max_lookback")]
    pub max_lookback_days: i64,

    /// Longest single backend query, in hours
    #[serde(default = "default_chunk_hours")]
    pub chunk_hours: i64,

    /// Query extension absorbing ingestion lag, in seconds
    #[serde(default = "default_ingestion_buffer")]
    pub ingestion_buffer_secs: i64,
}

fn default_site() -> String {
    std::env::var("DD_SITE").unwrap_or_else(|_| "datadoghq.com".to_string())
}

fn default_query_timeout() -> u64 {
    30
}

fn default_max_concurrent_queries() -> usize {
    4
}

fn default_activity_window() -> i64 {
    60
}

fn default_max_lookback() -> i64 {
    7
}

fn default_chunk_hours() -> i64 {
    24
}

fn default_ingestion_buffer() -> i64 {
    300
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            site: default_site(),
            query_timeout_secs: default_query_timeout(),
            max_concurrent_queries: default_max_concurrent_queries(),
            activity_window_secs: default_activity_window(),
            max_lookback_days: default_max_lookback(),
            chunk_hours: default_chunk_hours(),
            ingestion_buffer_secs: default_ingestion_buffer(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file and environment
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific file (if present) and environment
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Json)
                    .required(false),
            )
            .add_source(config::Environment::with_prefix("PODMEM").try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("podmem").join("config.json"))
    }

    /// API base URL for the configured site
    pub fn api_url(&self) -> String {
        format!("https://api.{}", self.site.trim_start_matches("https://"))
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            planner: PlannerConfig {
                max_lookback: Duration::days(self.max_lookback_days),
                chunk_size: Duration::hours(self.chunk_hours.max(1)),
                ingestion_buffer: Duration::seconds(self.ingestion_buffer_secs),
                ..Default::default()
            },
            dispatch: DispatchConfig {
                query_timeout: std::time::Duration::from_secs(self.query_timeout_secs),
                max_concurrent_queries: self.max_concurrent_queries,
            },
            reducer: ReducerConfig {
                activity_window: Duration::seconds(self.activity_window_secs),
                ..Default::default()
            },
        }
    }
}

/// Missing Datadog credentials
#[derive(Debug, Error, PartialEq, Eq)]
#[error("missing required environment variables: {}", .0.join(", "))]
pub struct MissingCredentials(pub Vec<&'static str>);

/// Datadog API credentials
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub app_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("app_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the process environment
    pub fn from_env() -> Result<Self, MissingCredentials> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through `lookup`, reporting every missing variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MissingCredentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let api_key = read(API_KEY_VAR);
        let app_key = read(APP_KEY_VAR);

        match (api_key, app_key) {
            (Some(api_key), Some(app_key)) => Ok(Self { api_key, app_key }),
            (api_key, app_key) => {
                let mut missing = Vec::new();
                if api_key.is_none() {
                    missing.push(API_KEY_VAR);
                }
                if app_key.is_none() {
                    missing.push(APP_KEY_VAR);
                }
                Err(MissingCredentials(missing))
            }
        }
    }
}
