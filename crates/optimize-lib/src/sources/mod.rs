//! External collaborators of the pipeline
//!
//! The controller only talks to these traits. Concrete implementations:
//! - [`JsonCollectionStore`]: file-backed document collections for config and snapshots
//! - [`FileTelemetrySource`]: accounts and exported telemetry samples on disk
//! - [`crate::pricing::HttpPricingProvider`]: regional on-demand pricing over HTTP

mod files;
mod store;

pub use files::{FileTelemetrySource, ACCOUNTS_FILE, SAMPLES_DIR};
pub use store::{JsonCollectionStore, CONFIG_COLLECTION, CONFIG_DOCUMENT_ID, SNAPSHOT_COLLECTION};

use crate::config::Config;
use crate::error::Result;
use crate::models::{Account, AccountSamples, Snapshot};
use crate::pricing::PricingCatalog;
use async_trait::async_trait;

/// Parameters of a per-account telemetry query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleQuery {
    /// Percentile of CPU and memory to report
    pub optimize_by: u8,
    /// Window in hours
    pub period_hours: u32,
}

impl SampleQuery {
    pub fn from_config(config: &Config) -> Self {
        Self {
            optimize_by: config.optimize_by,
            period_hours: config.last_report_period,
        }
    }
}

/// Persistence of the optimization config
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Stored config, `None` when nothing has been written yet
    async fn load_config(&self) -> Result<Option<Config>>;

    async fn save_config(&self, config: &Config) -> Result<()>;
}

/// Account discovery
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn list_accounts(&self) -> Result<Vec<Account>>;
}

/// Per-account instance telemetry
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn query_instance_samples(
        &self,
        account: &Account,
        query: SampleQuery,
    ) -> Result<AccountSamples>;
}

/// Regional on-demand pricing
#[async_trait]
pub trait PricingProvider: Send + Sync {
    async fn fetch_region_pricing(&self, region: &str) -> Result<PricingCatalog>;
}

/// Stored snapshots, oldest first
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn list_snapshots(&self) -> Result<Vec<Snapshot>>;
}
