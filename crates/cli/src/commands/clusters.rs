//! Cluster discovery command

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use tabled::Tabled;

use crate::client::DatadogClient;
use crate::output::{print_warning, OutputFormat};

/// Row for clusters table
#[derive(Tabled)]
struct ClusterRow {
    #[tabled(rename = "Cluster")]
    name: String,
}

/// List clusters that reported metrics during the last hour
pub async fn list_clusters(client: &DatadogClient, format: OutputFormat) -> Result<()> {
    let clusters = client.list_clusters(Utc::now().timestamp()).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&serde_json::json!({ "clusters": clusters }))?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            println!("{}", "Available Clusters".bold());
            println!("{}", "=".repeat(40));

            if clusters.is_empty() {
                print_warning("No clusters reported metrics in the last hour");
                return Ok(());
            }

            let rows: Vec<ClusterRow> = clusters
                .iter()
                .map(|name| ClusterRow { name: name.clone() })
                .collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} clusters", clusters.len());
        }
    }

    Ok(())
}
