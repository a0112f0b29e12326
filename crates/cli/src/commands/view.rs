//! Grouped optimization view

use anyhow::Result;
use colored::Colorize;
use optimize_lib::{Group, InstanceRecord, OptimizationView, Phase, Totals};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_classification, format_currency, format_percent, percent_of, print_json, print_table,
    print_warning, CostPeriod, OutputFormat,
};

/// Row for the groups table
#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "Group")]
    key: String,
    #[tabled(rename = "Instances")]
    instances: usize,
    #[tabled(rename = "Optimizable")]
    optimized: usize,
    #[tabled(rename = "Stale")]
    stale: usize,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Optimized")]
    optimized_cost: String,
    #[tabled(rename = "Saving")]
    saving: String,
}

/// Row for the instances table
#[derive(Tabled)]
struct InstanceRow {
    #[tabled(rename = "Instance")]
    instance: String,
    #[tabled(rename = "Type")]
    instance_type: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Mem")]
    memory: String,
    #[tabled(rename = "Status")]
    classification: String,
    #[tabled(rename = "Suggested")]
    suggested: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Optimized")]
    optimized: String,
}

fn group_rows(view: &OptimizationView, period: CostPeriod) -> Vec<GroupRow> {
    let factor = period.multiplier();
    view.sorted_groups
        .iter()
        .map(|group| GroupRow {
            key: group.key.clone(),
            instances: group.totals.instance_count,
            optimized: group.totals.optimized_count,
            stale: group.totals.stale_count,
            current: format_currency(group.totals.non_optimized_cost * factor),
            optimized_cost: format_currency(group.totals.optimized_cost * factor),
            saving: format_currency(group.totals.saving * factor),
        })
        .collect()
}

fn instance_rows(group: &Group, period: CostPeriod) -> Vec<InstanceRow> {
    let factor = period.multiplier();
    group
        .instances
        .iter()
        .map(|record: &InstanceRecord| InstanceRow {
            instance: record
                .hostname
                .clone()
                .unwrap_or_else(|| record.instance_id.clone()),
            instance_type: record.instance_type.clone(),
            region: record.region.clone(),
            cpu: format_percent(record.cpu_percent),
            memory: format_percent(record.memory_percent),
            classification: color_classification(record.classification),
            suggested: record
                .recommendation
                .as_ref()
                .map(|r| r.instance_type.clone())
                .unwrap_or_else(|| "-".to_string()),
            current: format_currency(record.current_cost * factor),
            optimized: format_currency(record.optimized_cost * factor),
        })
        .collect()
}

fn print_progress(view: &OptimizationView) {
    let progress = format!("{}/{}", view.completed_accounts, view.total_accounts);
    let phase = format!("{:?}", view.phase);
    if view.phase == Phase::Idle || view.phase == Phase::Aggregated {
        println!("Accounts: {}  Instances: {}", progress.cyan(), view.instance_count);
    } else {
        println!(
            "Accounts: {}  Instances: {}  ({})",
            progress.cyan(),
            view.instance_count,
            phase.yellow()
        );
    }
}

fn print_totals(totals: &Totals, period: CostPeriod) {
    let factor = period.multiplier();
    println!("{}", format!("{} Totals", period.label()).bold());
    println!("{}", "-".repeat(50));
    println!(
        "Current:                {}",
        format_currency(totals.non_optimized_cost * factor)
    );
    println!(
        "Optimized:              {}",
        format_currency(totals.optimized_cost * factor).green()
    );
    println!(
        "Stale:                  {} ({} instances)",
        format_currency(totals.stale_cost * factor).red(),
        totals.stale_count
    );
    println!(
        "{} {} ({:.1}%)",
        "Potential Saving:".bold(),
        format_currency(totals.saving * factor).green().bold(),
        percent_of(totals.saving, totals.non_optimized_cost)
    );
}

/// Show the grouped view with totals
pub async fn show_view(client: &ApiClient, period: CostPeriod, format: OutputFormat) -> Result<()> {
    let view = client.view().await?;

    match format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            println!("{}", "Cloud Optimize".bold());
            println!("{}", "=".repeat(50));
            print_progress(&view);
            println!();

            if view.sorted_groups.is_empty() {
                print_warning("No instances collected yet");
                return Ok(());
            }

            print_table(&group_rows(&view, period));
            println!();
            print_totals(&view.totals, period);
        }
    }

    Ok(())
}

/// Show the member instances of one group
pub async fn show_instances(
    client: &ApiClient,
    key: &str,
    period: CostPeriod,
    format: OutputFormat,
) -> Result<()> {
    let view = client.view().await?;

    let Some(group) = view.sorted_groups.iter().find(|g| g.key == key) else {
        anyhow::bail!(
            "No group named '{}' (available: {})",
            key,
            view.sorted_groups
                .iter()
                .map(|g| g.key.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    };

    match format {
        OutputFormat::Json => print_json(group)?,
        OutputFormat::Table => {
            println!("{} {}", "Group:".bold(), group.key.cyan());
            println!();
            print_table(&instance_rows(group, period));
            println!();
            print_totals(&group.totals, period);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use optimize_lib::{Classification, Recommendation};

    fn record(id: &str, classification: Classification) -> InstanceRecord {
        InstanceRecord {
            account_id: 1,
            account_name: "production".to_string(),
            instance_id: id.to_string(),
            instance_type: "m5.xlarge".to_string(),
            instance_family: "m5".to_string(),
            region: "us-east-1".to_string(),
            hostname: None,
            cpu_percent: 20.0,
            memory_percent: 30.0,
            receive_bytes_per_second: 0.0,
            transmit_bytes_per_second: 0.0,
            list_price_hourly: Some(0.2),
            current_hourly_cost: 0.2,
            current_cost: 144.0,
            period_cost: 4.8,
            recommendation: Some(Recommendation {
                instance_type: "m5.large".to_string(),
                hourly_price: 0.1,
                vcpu: 2,
                memory_gib: 8.0,
            }),
            optimized_hourly_cost: 0.1,
            optimized_cost: 72.0,
            classification,
        }
    }

    fn view() -> OptimizationView {
        let records = vec![record("i-1", Classification::Optimized)];
        OptimizationView {
            sorted_groups: vec![Group {
                key: "production".to_string(),
                ungrouped: false,
                totals: Totals::from_records(&records),
                instances: records,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_group_rows_yearly() {
        let rows = group_rows(&view(), CostPeriod::Yearly);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "production");
        assert_eq!(rows[0].optimized, 1);
        assert_eq!(rows[0].current, "$1728.00");
        assert_eq!(rows[0].saving, "$864.00");
    }

    #[test]
    fn test_instance_rows() {
        let view = view();
        let rows = instance_rows(&view.sorted_groups[0], CostPeriod::Monthly);

        assert_eq!(rows[0].instance, "i-1");
        assert_eq!(rows[0].suggested, "m5.large");
        assert_eq!(rows[0].current, "$144.00");
        assert_eq!(rows[0].optimized, "$72.00");
    }
}
