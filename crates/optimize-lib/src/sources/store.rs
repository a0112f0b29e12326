//! File-backed document collections
//!
//! Each collection is a directory under the store root and each document a
//! `<id>.json` file inside it. Documents are listed in id order.

use super::{ConfigStore, SnapshotSource};
use crate::config::Config;
use crate::error::{OptimizeError, Result};
use crate::models::Snapshot;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Collection holding the optimization config
pub const CONFIG_COLLECTION: &str = "cloudOptimizeCfg";

/// Id of the config document
pub const CONFIG_DOCUMENT_ID: &str = "main";

/// Collection holding snapshots
pub const SNAPSHOT_COLLECTION: &str = "cloudOptimizeSnapshots";

/// Document store on the local filesystem
#[derive(Debug, Clone)]
pub struct JsonCollectionStore {
    root: PathBuf,
}

impl JsonCollectionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(collection)
    }

    fn document_path(&self, collection: &str, id: &str) -> PathBuf {
        self.collection_dir(collection).join(format!("{}.json", id))
    }

    /// All documents of a collection as `(id, document)` pairs in id order
    pub async fn get_collection(&self, collection: &str) -> Result<Vec<(String, Value)>> {
        let dir = self.collection_dir(collection);
        if !tokio::fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&dir).await?;
        let mut documents = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = tokio::fs::read(&path).await?;
            match serde_json::from_slice::<Value>(&content) {
                Ok(document) => documents.push((id.to_string(), document)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable document");
                }
            }
        }

        documents.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(documents)
    }

    /// Read a single document
    pub async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let path = self.document_path(collection, id);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }

        let content = tokio::fs::read(&path).await?;
        Ok(Some(serde_json::from_slice(&content)?))
    }

    /// Create or replace a document
    pub async fn write_document(&self, collection: &str, id: &str, document: &Value) -> Result<()> {
        let dir = self.collection_dir(collection);
        tokio::fs::create_dir_all(&dir).await?;

        let path = self.document_path(collection, id);
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(document)?;

        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        debug!(collection = %collection, id = %id, "Wrote document");
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for JsonCollectionStore {
    async fn load_config(&self) -> Result<Option<Config>> {
        let document = self
            .get_document(CONFIG_COLLECTION, CONFIG_DOCUMENT_ID)
            .await
            .map_err(|e| OptimizeError::ConfigLoad(e.to_string()))?;

        document
            .map(serde_json::from_value::<Config>)
            .transpose()
            .map_err(|e| OptimizeError::ConfigLoad(e.to_string()))
    }

    async fn save_config(&self, config: &Config) -> Result<()> {
        let document = serde_json::to_value(config)?;
        self.write_document(CONFIG_COLLECTION, CONFIG_DOCUMENT_ID, &document)
            .await
            .map_err(|e| OptimizeError::Store(e.to_string()))
    }
}

#[async_trait]
impl SnapshotSource for JsonCollectionStore {
    async fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        let documents = self.get_collection(SNAPSHOT_COLLECTION).await?;
        Ok(documents
            .into_iter()
            .map(|(id, document)| Snapshot { id, document })
            .collect())
    }
}
