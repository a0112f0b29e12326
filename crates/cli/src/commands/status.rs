//! Daemon status, refresh and snapshot commands

use anyhow::Result;
use colored::Colorize;
use optimize_lib::Snapshot;
use serde_json::json;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_status, print_info, print_json, print_success, print_table, print_warning, OutputFormat,
};

/// Row for the component health table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Row for the snapshots table
#[derive(Tabled)]
struct SnapshotRow {
    #[tabled(rename = "Snapshot")]
    id: String,
    #[tabled(rename = "Summary")]
    summary: String,
}

const SUMMARY_WIDTH: usize = 60;

fn summarize(snapshot: &Snapshot) -> String {
    let text = snapshot.document.to_string();
    if text.chars().count() <= SUMMARY_WIDTH {
        return text;
    }
    let truncated: String = text.chars().take(SUMMARY_WIDTH - 3).collect();
    format!("{}...", truncated)
}

/// Show daemon health and readiness
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;
    let readiness = client.readiness().await?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "health": health,
            "readiness": readiness,
        }))?,
        OutputFormat::Table => {
            println!("{}", "Optimizer Status".bold());
            println!("{}", "=".repeat(50));
            println!("Health:                 {}", color_status(health.status));
            if readiness.ready {
                println!("Ready:                  {}", "yes".green());
            } else {
                println!(
                    "Ready:                  {} ({})",
                    "no".yellow(),
                    readiness.reason.as_deref().unwrap_or("unknown")
                );
            }
            println!();

            let mut rows: Vec<ComponentRow> = health
                .components
                .into_iter()
                .map(|(name, component)| ComponentRow {
                    name,
                    status: color_status(component.status),
                    message: component.message.unwrap_or_else(|| "-".to_string()),
                })
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            print_table(&rows);
        }
    }

    Ok(())
}

/// Start a fetch cycle on the daemon
pub async fn refresh(client: &ApiClient, format: OutputFormat) -> Result<()> {
    client.refresh().await?;

    match format {
        OutputFormat::Json => print_json(&json!({"accepted": true}))?,
        OutputFormat::Table => {
            print_success("Fetch cycle started");
            print_info("Run `co view` to follow progress");
        }
    }

    Ok(())
}

/// List stored snapshots, newest first
pub async fn list_snapshots(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let snapshots = client.snapshots().await?;

    match format {
        OutputFormat::Json => print_json(&snapshots)?,
        OutputFormat::Table => {
            if snapshots.is_empty() {
                print_warning("No snapshots stored");
                return Ok(());
            }

            let rows: Vec<SnapshotRow> = snapshots
                .iter()
                .map(|snapshot| SnapshotRow {
                    id: snapshot.id.clone(),
                    summary: summarize(snapshot),
                })
                .collect();
            print_table(&rows);
        }
    }

    Ok(())
}
