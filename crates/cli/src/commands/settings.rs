//! Config and pricing region commands

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use optimize_lib::{Config, ConfigUpdate, Trigger};
use serde_json::{Map, Number, Value};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{print_json, print_success, print_table, OutputFormat};

/// What the daemon should do with collected data after an update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum TriggerArg {
    /// Store the config only
    None,
    /// Regroup and resort the current view
    Regroup,
    /// Recompute every record, then regroup
    #[default]
    Recalc,
}

impl From<TriggerArg> for Trigger {
    fn from(arg: TriggerArg) -> Self {
        match arg {
            TriggerArg::None => Trigger::None,
            TriggerArg::Regroup => Trigger::GroupAndSort,
            TriggerArg::Recalc => Trigger::GroupAndSortRecalc,
        }
    }
}

/// Row for the config table
#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "Setting")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

const LIST_FIELDS: &[&str] = &["instance_options", "instance_options_current"];

fn parse_value(field: &str, raw: &str) -> Value {
    if LIST_FIELDS.contains(&field) {
        let items = raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| Value::String(item.to_string()))
            .collect();
        return Value::Array(items);
    }

    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(Number::from(int));
    }
    if let Some(number) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(number);
    }
    Value::String(raw.to_string())
}

/// Build an update from `field=value` assignments
pub fn parse_assignments(assignments: &[String]) -> Result<ConfigUpdate> {
    let mut fields = Map::new();

    for assignment in assignments {
        let (field, raw) = assignment
            .split_once('=')
            .with_context(|| format!("Expected field=value, got '{}'", assignment))?;
        let field = field.trim();
        fields.insert(field.to_string(), parse_value(field, raw.trim()));
    }

    serde_json::from_value(Value::Object(fields)).context("Invalid config update")
}

fn setting_rows(config: &Config) -> Result<Vec<SettingRow>> {
    let value = serde_json::to_value(config)?;
    let Value::Object(fields) = value else {
        anyhow::bail!("Unexpected config shape");
    };

    Ok(fields
        .into_iter()
        .map(|(name, value)| SettingRow {
            name,
            value: match value {
                Value::String(s) => s,
                Value::Array(items) if items.is_empty() => "-".to_string(),
                other => other.to_string(),
            },
        })
        .collect())
}

fn print_config(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(config),
        OutputFormat::Table => {
            print_table(&setting_rows(config)?);
            Ok(())
        }
    }
}

/// Show the daemon's config
pub async fn show_config(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let config = client.config().await?;
    print_config(&config, format)
}

/// Apply `field=value` assignments
pub async fn set_config(
    client: &ApiClient,
    assignments: &[String],
    trigger: TriggerArg,
    format: OutputFormat,
) -> Result<()> {
    let update = parse_assignments(assignments)?;
    let config = client.update_config(update, trigger.into()).await?;

    if format == OutputFormat::Table {
        print_success(&format!(
            "Config updated ({})",
            Trigger::from(trigger).as_str()
        ));
    }
    print_config(&config, format)
}

/// Switch the pricing region
pub async fn change_region(client: &ApiClient, region: &str, format: OutputFormat) -> Result<()> {
    let config = client.change_region(region).await?;

    match format {
        OutputFormat::Json => print_json(&config),
        OutputFormat::Table => {
            print_success(&format!(
                "Pricing region set to {}",
                config.pricing_region().cyan()
            ));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optimize_lib::{GroupBy, SortDirection};

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_assignments() {
        let update = parse_assignments(&args(&[
            "group_by=region",
            "sort=asc",
            "optimize_by=95",
            "discount_multiplier=0.8",
            "stale_instance_cpu=3",
            "instance_options_current=m5, t3",
        ]))
        .unwrap();

        assert_eq!(update.group_by, Some(GroupBy::Region));
        assert_eq!(update.sort, Some(SortDirection::Asc));
        assert_eq!(update.optimize_by, Some(95));
        assert_eq!(update.discount_multiplier, Some(0.8));
        assert_eq!(update.stale_instance_cpu, Some(3.0));
        assert_eq!(
            update.instance_options_current,
            Some(vec!["m5".to_string(), "t3".to_string()])
        );
        assert_eq!(update.right_size_cpu, None);
    }

    #[test]
    fn test_parse_rejects_unknown_field() {
        assert!(parse_assignments(&args(&["colour=blue"])).is_err());
    }

    #[test]
    fn test_parse_rejects_missing_equals() {
        assert!(parse_assignments(&args(&["group_by"])).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_enum_value() {
        assert!(parse_assignments(&args(&["group_by=hostname"])).is_err());
    }

    #[test]
    fn test_trigger_mapping() {
        assert_eq!(Trigger::from(TriggerArg::None), Trigger::None);
        assert_eq!(Trigger::from(TriggerArg::Regroup), Trigger::GroupAndSort);
        assert_eq!(
            Trigger::from(TriggerArg::Recalc),
            Trigger::GroupAndSortRecalc
        );
    }

    #[test]
    fn test_setting_rows_cover_every_field() {
        let rows = setting_rows(&Config::default()).unwrap();

        let region = rows
            .iter()
            .find(|r| r.name == "aws_pricing_region")
            .unwrap();
        assert_eq!(region.value, "us-east-1");
        assert_eq!(rows.len(), 15);
    }
}
