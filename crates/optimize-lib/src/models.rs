//! Core data models for the optimization pipeline

use serde::{Deserialize, Serialize};

/// An account discovered by the account source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
}

impl Account {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// One instance telemetry point for an account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub instance_id: String,
    pub instance_type: String,
    pub region: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub num_cpu: Option<u32>,
    #[serde(default)]
    pub memory_total_bytes: Option<u64>,
    #[serde(default)]
    pub cpu_percent: f64,
    #[serde(default)]
    pub memory_percent: f64,
}

/// Network throughput for one instance, joined to a [`RawSample`] by instance id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSample {
    pub instance_id: String,
    #[serde(default)]
    pub receive_bytes_per_second: f64,
    #[serde(default)]
    pub transmit_bytes_per_second: f64,
}

/// Result of a telemetry query for one account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountSamples {
    #[serde(default)]
    pub system_samples: Vec<RawSample>,
    #[serde(default)]
    pub network_samples: Vec<NetworkSample>,
}

/// Optimization classification of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// A cheaper right-sized instance type was found
    Optimized,
    /// No cheaper option applies
    NonOptimized,
    /// Idle instance, candidate for removal
    Stale,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Optimized => "optimized",
            Classification::NonOptimized => "non_optimized",
            Classification::Stale => "stale",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommended substitute for an instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub instance_type: String,
    pub hourly_price: f64,
    pub vcpu: u32,
    pub memory_gib: f64,
}

/// Fully derived state of one instance for a processing pass.
///
/// `current_cost` and `optimized_cost` are monthly figures after the discount
/// multiplier has been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub account_id: i64,
    pub account_name: String,
    pub instance_id: String,
    pub instance_type: String,
    pub instance_family: String,
    pub region: String,
    pub hostname: Option<String>,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub receive_bytes_per_second: f64,
    pub transmit_bytes_per_second: f64,
    /// List price per hour, `None` when the type is not in the catalog
    pub list_price_hourly: Option<f64>,
    pub current_hourly_cost: f64,
    pub current_cost: f64,
    /// Cost over the telemetry window
    pub period_cost: f64,
    pub recommendation: Option<Recommendation>,
    pub optimized_hourly_cost: f64,
    pub optimized_cost: f64,
    pub classification: Classification,
}

impl InstanceRecord {
    /// Monthly saving if the recommendation is applied
    pub fn saving(&self) -> f64 {
        self.current_cost - self.optimized_cost
    }
}

/// Opaque snapshot document passed through to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub document: serde_json::Value,
}
