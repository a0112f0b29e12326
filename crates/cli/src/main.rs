//! Cloud Optimize CLI
//!
//! A command-line client for the cloud-optimizer daemon: browse the grouped
//! cost view, tune the optimization config and check daemon health.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{settings, status, view};
use output::{CostPeriod, OutputFormat};

/// Cloud Optimize CLI
#[derive(Parser)]
#[command(name = "co")]
#[command(author, version, about = "CLI for Cloud Optimize", long_about = None)]
pub struct Cli {
    /// Daemon URL (can also be set via CO_API_URL env var or the config file)
    #[arg(long, env = "CO_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show groups, totals and fetch progress
    View {
        /// Show yearly instead of monthly costs
        #[arg(long)]
        yearly: bool,
    },

    /// Show the instances of one group
    Instances {
        /// Group key as shown by `co view`
        group: String,

        /// Show yearly instead of monthly costs
        #[arg(long)]
        yearly: bool,
    },

    /// Show or update the optimization config
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Switch the pricing region and reprice collected instances
    Region {
        /// Region code, e.g. eu-west-1
        region: String,
    },

    /// Start a fetch cycle now
    Refresh,

    /// List stored snapshots, newest first
    Snapshots,

    /// Show daemon health and readiness
    Status,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the current config
    Show,

    /// Update config fields
    Set {
        /// Assignments such as group_by=region or stale_instance_cpu=3
        #[arg(required = true)]
        assignments: Vec<String>,

        /// What to do with collected data after the update
        #[arg(long, value_enum, default_value_t = settings::TriggerArg::Recalc)]
        trigger: settings::TriggerArg,
    },
}

async fn run(cli: Cli) -> Result<()> {
    let file_config = config::CliConfig::load()?;
    let format = file_config.resolve_format(cli.format);
    let client = client::ApiClient::new(&file_config.resolve_api_url(cli.api_url))?;

    match cli.command {
        Commands::View { yearly } => {
            view::show_view(&client, CostPeriod::from_flag(yearly), format).await?;
        }
        Commands::Instances { group, yearly } => {
            view::show_instances(&client, &group, CostPeriod::from_flag(yearly), format).await?;
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Show => {
                settings::show_config(&client, format).await?;
            }
            ConfigCommands::Set {
                assignments,
                trigger,
            } => {
                settings::set_config(&client, &assignments, trigger, format).await?;
            }
        },
        Commands::Region { region } => {
            settings::change_region(&client, &region, format).await?;
        }
        Commands::Refresh => {
            status::refresh(&client, format).await?;
        }
        Commands::Snapshots => {
            status::list_snapshots(&client, format).await?;
        }
        Commands::Status => {
            status::show_status(&client, format).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
