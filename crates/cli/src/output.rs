//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use optimize_lib::{Classification, ComponentStatus};
use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Cost period the view is rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostPeriod {
    Monthly,
    Yearly,
}

impl CostPeriod {
    pub fn from_flag(yearly: bool) -> Self {
        if yearly {
            CostPeriod::Yearly
        } else {
            CostPeriod::Monthly
        }
    }

    /// Factor applied to monthly figures
    pub fn multiplier(&self) -> f64 {
        match self {
            CostPeriod::Monthly => 1.0,
            CostPeriod::Yearly => 12.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CostPeriod::Monthly => "Monthly",
            CostPeriod::Yearly => "Yearly",
        }
    }
}

/// Print a table from a list of rows
pub fn print_table<T: Tabled>(rows: &[T]) {
    if rows.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format currency
pub fn format_currency(amount: f64) -> String {
    format!("${:.2}", amount)
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Share of `part` in `whole` as a percentage, 0 when `whole` is 0
pub fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

pub fn color_classification(classification: Classification) -> String {
    let label = classification.as_str();
    match classification {
        Classification::Optimized => label.green().to_string(),
        Classification::NonOptimized => label.yellow().to_string(),
        Classification::Stale => label.red().to_string(),
    }
}

/// Color status based on value
pub fn color_status(status: ComponentStatus) -> String {
    match status {
        ComponentStatus::Healthy => "healthy".green().to_string(),
        ComponentStatus::Degraded => "degraded".yellow().to_string(),
        ComponentStatus::Unhealthy => "unhealthy".red().to_string(),
    }
}
