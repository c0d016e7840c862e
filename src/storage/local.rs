//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── {category}.json       # { "bridges": [ BridgeRecord, ... ] }
//! ```
//!
//! Files are replaced atomically (write to temp, then rename). Rewrites work on
//! the JSON entries as stored, so an entry that does not decode as a
//! `BridgeRecord` is written back untouched. A file that is not a store
//! document at all is reported as corrupt.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{BridgeRecord, Category};
use crate::storage::{BridgeStore, StoreFile};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Path of the store file for a category.
    pub fn path(&self, category: Category) -> PathBuf {
        self.root_dir.join(format!("{}.json", category.key()))
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.ensure_dir(path).await?;

        let tmp = path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn write_entries(&self, category: Category, bridges: Vec<Value>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&StoreFile { bridges })?;
        self.write_bytes(&self.path(category), &bytes).await
    }

    /// Read the stored entries of a category. `None` means the file does not exist.
    async fn read_entries(&self, category: Category) -> Result<Option<Vec<Value>>> {
        let path = self.path(category);
        let Some(bytes) = self.read_bytes(&path).await? else {
            return Ok(None);
        };

        let file: StoreFile =
            serde_json::from_slice(&bytes).map_err(|e| AppError::store_corrupt(&path, e))?;
        Ok(Some(file.bridges))
    }
}

/// The `bridge` line of a stored entry, if it has one.
fn entry_raw(entry: &Value) -> Option<&str> {
    entry.get("bridge").and_then(Value::as_str)
}

/// Keep the last entry per trimmed `bridge` line, ordered byte-wise.
///
/// Entries without a `bridge` line follow in their original order.
pub fn dedup_sorted(entries: Vec<Value>) -> Vec<Value> {
    let mut unique: BTreeMap<String, Value> = BTreeMap::new();
    let mut unkeyed = Vec::new();
    for entry in entries {
        match entry_raw(&entry).map(|raw| raw.trim().to_string()) {
            Some(key) => {
                unique.insert(key, entry);
            }
            None => unkeyed.push(entry),
        }
    }
    unique.into_values().chain(unkeyed).collect()
}

#[async_trait]
impl BridgeStore for LocalStorage {
    async fn load_all_raw(&self) -> HashSet<String> {
        let mut raws = HashSet::new();
        for category in Category::ALL {
            match self.read_entries(category).await {
                Ok(Some(entries)) => {
                    raws.extend(entries.iter().filter_map(entry_raw).map(str::to_string))
                }
                Ok(None) => log::debug!("No store for {} yet", category),
                Err(e) => log::error!("Treating {} store as empty: {}", category, e),
            }
        }
        raws
    }

    async fn load(&self, category: Category) -> Result<Vec<BridgeRecord>> {
        let entries = self.read_entries(category).await?.unwrap_or_default();

        let mut records = Vec::with_capacity(entries.len());
        for (i, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<BridgeRecord>(entry) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping entry {} of {} store: {}", i, category, e),
            }
        }
        Ok(records)
    }

    async fn append(&self, category: Category, record: &BridgeRecord) -> Result<()> {
        let mut bridges = match self.read_entries(category).await {
            Ok(entries) => entries.unwrap_or_default(),
            Err(e @ AppError::StoreCorrupt { .. }) => {
                log::error!("Overwriting {} store while appending: {}", category, e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        bridges.push(serde_json::to_value(record)?);
        self.write_entries(category, bridges).await
    }

    async fn normalize(&self, category: Category) -> Result<usize> {
        let Some(entries) = self.read_entries(category).await? else {
            self.write_entries(category, Vec::new()).await?;
            log::info!("Created {}", self.path(category).display());
            return Ok(0);
        };

        let before = entries.len();
        let bridges = dedup_sorted(entries);
        let count = bridges.len();
        if count < before {
            log::info!("Removed {} duplicate(s) from {}", before - count, category);
        }

        self.write_entries(category, bridges).await?;
        Ok(count)
    }
}
