//! Daemon settings

use anyhow::Result;
use optimize_lib::pricing::{PricingProviderConfig, DEFAULT_PRICING_BASE_URL};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Daemon settings, read from `OPTIMIZER_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct OptimizerSettings {
    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Root of the document store and the exported telemetry
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_pricing_base_url")]
    pub pricing_base_url: String,

    /// Relay that fetches the pricing document on our behalf
    #[serde(default)]
    pub pricing_relay_url: Option<String>,

    #[serde(default = "default_pricing_timeout")]
    pub pricing_timeout_secs: u64,

    /// Fetch cycle interval in seconds
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

fn default_api_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_pricing_base_url() -> String {
    DEFAULT_PRICING_BASE_URL.to_string()
}

fn default_pricing_timeout() -> u64 {
    30
}

fn default_refresh_interval() -> u64 {
    3600
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            data_dir: default_data_dir(),
            pricing_base_url: default_pricing_base_url(),
            pricing_relay_url: None,
            pricing_timeout_secs: default_pricing_timeout(),
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

impl OptimizerSettings {
    /// Load settings from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("OPTIMIZER"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid optimizer settings, using defaults");
            OptimizerSettings::default()
        }))
    }

    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }

    pub fn telemetry_dir(&self) -> PathBuf {
        self.data_dir.join("telemetry")
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn pricing_config(&self) -> PricingProviderConfig {
        PricingProviderConfig {
            base_url: self.pricing_base_url.clone(),
            relay_url: self.pricing_relay_url.clone(),
            timeout: Duration::from_secs(self.pricing_timeout_secs),
        }
    }
}
