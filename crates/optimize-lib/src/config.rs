//! Optimization config
//!
//! The config is an immutable snapshot for the duration of a processing pass.
//! Every field has a default so partially stored documents never fail to load.

use crate::models::InstanceRecord;
use serde::{Deserialize, Serialize};

/// Default pricing region
pub const DEFAULT_PRICING_REGION: &str = "us-east-1";

/// Field by which instance records are partitioned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    AccountName,
    AccountId,
    Region,
    InstanceType,
    InstanceFamily,
    Classification,
}

impl GroupBy {
    /// Group key of a record, `None` when the field is empty
    pub fn key_of(&self, record: &InstanceRecord) -> Option<String> {
        let key = match self {
            GroupBy::AccountName => record.account_name.clone(),
            GroupBy::AccountId => record.account_id.to_string(),
            GroupBy::Region => record.region.clone(),
            GroupBy::InstanceType => record.instance_type.clone(),
            GroupBy::InstanceFamily => record.instance_family.clone(),
            GroupBy::Classification => record.classification.as_str().to_string(),
        };

        if key.is_empty() {
            None
        } else {
            Some(key)
        }
    }
}

/// Group field used to order the grouped view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    NonOptimizedCost,
    OptimizedCost,
    Saving,
    InstanceCount,
    OptimizedCount,
    StaleCount,
    /// Group key
    Name,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Thresholds and switches for a processing pass
///
/// Fields missing from a stored document deserialize to zero or empty values;
/// the documented defaults only apply when no document exists at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Percentile used by the telemetry query for CPU and memory
    #[serde(default)]
    pub optimize_by: u8,
    #[serde(default)]
    pub group_by: GroupBy,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub sort: SortDirection,
    #[serde(default)]
    pub discount_multiplier: f64,
    /// Telemetry window in hours
    #[serde(default)]
    pub last_report_period: u32,
    #[serde(default)]
    pub stale_instance_cpu: f64,
    #[serde(default)]
    pub stale_instance_mem: f64,
    #[serde(default)]
    pub stale_receive_bytes_per_second: f64,
    #[serde(default)]
    pub stale_transmit_bytes_per_second: f64,
    #[serde(default)]
    pub right_size_cpu: f64,
    #[serde(default)]
    pub right_size_mem: f64,
    #[serde(default)]
    pub aws_pricing_region: String,
    #[serde(default)]
    pub instance_options_current: Vec<String>,
    #[serde(default)]
    pub instance_options: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            optimize_by: 50,
            group_by: GroupBy::default(),
            sort_by: SortBy::default(),
            sort: SortDirection::default(),
            discount_multiplier: 1.0,
            last_report_period: 24,
            stale_instance_cpu: 5.0,
            stale_instance_mem: 5.0,
            stale_receive_bytes_per_second: 0.0,
            stale_transmit_bytes_per_second: 0.0,
            right_size_cpu: 0.5,
            right_size_mem: 0.5,
            aws_pricing_region: DEFAULT_PRICING_REGION.to_string(),
            instance_options_current: Vec::new(),
            instance_options: Vec::new(),
        }
    }
}

impl Config {
    /// Substitution list in effect: the current selection, else the full list
    pub fn allowed_instance_options(&self) -> &[String] {
        if self.instance_options_current.is_empty() {
            &self.instance_options
        } else {
            &self.instance_options_current
        }
    }

    /// Pricing region, falling back to the default when unset
    pub fn pricing_region(&self) -> &str {
        if self.aws_pricing_region.is_empty() {
            DEFAULT_PRICING_REGION
        } else {
            &self.aws_pricing_region
        }
    }
}

/// Partial config update coming from the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigUpdate {
    pub optimize_by: Option<u8>,
    pub group_by: Option<GroupBy>,
    pub sort_by: Option<SortBy>,
    pub sort: Option<SortDirection>,
    pub discount_multiplier: Option<f64>,
    pub last_report_period: Option<u32>,
    pub stale_instance_cpu: Option<f64>,
    pub stale_instance_mem: Option<f64>,
    pub stale_receive_bytes_per_second: Option<f64>,
    pub stale_transmit_bytes_per_second: Option<f64>,
    pub right_size_cpu: Option<f64>,
    pub right_size_mem: Option<f64>,
    pub aws_pricing_region: Option<String>,
    pub instance_options_current: Option<Vec<String>>,
    pub instance_options: Option<Vec<String>>,
}

macro_rules! apply_fields {
    ($update:expr, $config:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $update.$field {
                $config.$field = value;
            }
        )+
    };
}

impl ConfigUpdate {
    /// Apply the set fields on top of `config`, returning the new snapshot
    pub fn apply(self, config: &Config) -> Config {
        let mut next = config.clone();
        apply_fields!(
            self,
            next,
            optimize_by,
            group_by,
            sort_by,
            sort,
            discount_multiplier,
            last_report_period,
            stale_instance_cpu,
            stale_instance_mem,
            stale_receive_bytes_per_second,
            stale_transmit_bytes_per_second,
            right_size_cpu,
            right_size_mem,
            aws_pricing_region,
            instance_options_current,
            instance_options,
        );
        next
    }
}

/// What to do with existing data after a config update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    /// Persist only
    #[default]
    None,
    /// Regroup and resort existing records
    GroupAndSort,
    /// Recompute records from retained samples, then regroup and resort
    GroupAndSortRecalc,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::None => "none",
            Trigger::GroupAndSort => "groupAndSort",
            Trigger::GroupAndSortRecalc => "groupAndSortRecalc",
        }
    }
}
