//! Telemetry and accounts read from exported query results
//!
//! Layout under the data directory:
//! - `accounts.json`: array of `{id, name}`
//! - `samples/<account id>.json`: `{system_samples, network_samples}`

use super::{AccountSource, SampleQuery, TelemetrySource};
use crate::error::{OptimizeError, Result};
use crate::models::{Account, AccountSamples};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

pub const ACCOUNTS_FILE: &str = "accounts.json";
pub const SAMPLES_DIR: &str = "samples";

/// Account and telemetry source backed by JSON files
#[derive(Debug, Clone)]
pub struct FileTelemetrySource {
    root: PathBuf,
}

impl FileTelemetrySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AccountSource for FileTelemetrySource {
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let path = self.root.join(ACCOUNTS_FILE);
        let content = tokio::fs::read(&path)
            .await
            .map_err(|e| OptimizeError::AccountQuery(format!("{}: {}", path.display(), e)))?;

        serde_json::from_slice(&content)
            .map_err(|e| OptimizeError::AccountQuery(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl TelemetrySource for FileTelemetrySource {
    async fn query_instance_samples(
        &self,
        account: &Account,
        query: SampleQuery,
    ) -> Result<AccountSamples> {
        let path = self
            .root
            .join(SAMPLES_DIR)
            .join(format!("{}.json", account.id));

        debug!(
            account_id = account.id,
            optimize_by = query.optimize_by,
            period_hours = query.period_hours,
            path = %path.display(),
            "Reading exported samples"
        );

        let sample_error = |message: String| OptimizeError::SampleQuery {
            account_id: account.id,
            message,
        };

        let content = tokio::fs::read(&path)
            .await
            .map_err(|e| sample_error(e.to_string()))?;

        serde_json::from_slice(&content).map_err(|e| sample_error(e.to_string()))
    }
}
