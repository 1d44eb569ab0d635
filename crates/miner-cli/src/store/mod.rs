//! Destinations for mined package records.
//!
//! The original job upserted into a document database keyed by package
//! name. [`JsonLinesStore`] appends those documents to a file instead,
//! and [`MemoryStore`] keeps them keyed by `_id` for dry runs and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use miner_core::error::{MinerError, MinerResult};
use miner_registry::{DownloadsPoint, PackageDocument};
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// One mined package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Package name
    #[serde(rename = "_id")]
    pub id: String,
    /// Full registry document
    pub pkg: PackageDocument,
    /// GitHub repository URL
    pub github: String,
    /// Downloads over the year ending at the last publish
    pub downloads: DownloadsPoint,
}

/// Somewhere to upsert records
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert `record`, replacing any earlier record with the same `_id`
    async fn upsert(&self, record: PackageRecord) -> MinerResult<()>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Appends one JSON document per line.
///
/// Later lines for the same `_id` supersede earlier ones when the file is
/// read back.
pub struct JsonLinesStore {
    path: Utf8PathBuf,
    file: Mutex<File>,
}

impl JsonLinesStore {
    /// Open `path` for appending, creating it and its parent directory
    pub async fn open(path: &Utf8Path) -> MinerResult<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MinerError::io(format!("Failed to create directory {}", parent), e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| MinerError::io(format!("Failed to open {}", path), e))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

#[async_trait]
impl DocumentStore for JsonLinesStore {
    async fn upsert(&self, record: PackageRecord) -> MinerResult<()> {
        let mut line = serde_json::to_vec(&record)
            .map_err(|e| MinerError::io(format!("Failed to encode record for {}", record.id), e.into()))?;
        line.push(b'\n');

        // One write per record under the lock keeps lines whole
        let mut file = self.file.lock().await;
        file.write_all(&line)
            .await
            .map_err(|e| MinerError::io(format!("Failed to write {}", self.path), e))?;
        file.flush()
            .await
            .map_err(|e| MinerError::io(format!("Failed to flush {}", self.path), e))?;

        debug!(package = %record.id, path = %self.path, "Record appended");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.to_string()
    }
}

/// Records kept in memory, keyed by `_id`
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, PackageRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.records.lock().await.len()
    }

    #[cfg(test)]
    pub async fn get(&self, id: &str) -> Option<PackageRecord> {
        self.records.lock().await.get(id).cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn upsert(&self, record: PackageRecord) -> MinerResult<()> {
        self.records.lock().await.insert(record.id.clone(), record);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory (dry run)".to_string()
    }
}

#[cfg(test)]
mod tests;
