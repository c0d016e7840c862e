//! Storage abstractions for bridge persistence.
//!
//! Every category owns one store holding `{ "bridges": [...] }`. A missing
//! store is an empty store.
//!
//! ## Directory Structure
//!
//! ```text
//! config/
//! ├── obfs4_ipv4.json
//! ├── obfs4_ipv6.json
//! ├── webtunnel_ipv4.json
//! └── webtunnel_ipv6.json
//! ```
//!
//! Writes are read-modify-write cycles without locking. Two concurrent runs
//! against the same directory may lose updates.

pub mod local;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{BridgeRecord, Category};

// Re-export for convenience
pub use local::LocalStorage;

/// On-disk shape of a category store.
///
/// Entries stay untyped so that rewrites carry records this version cannot
/// decode (hand edits, older layouts) through unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreFile {
    #[serde(default)]
    pub bridges: Vec<serde_json::Value>,
}

/// Trait for bridge storage backends.
#[async_trait]
pub trait BridgeStore: Send + Sync {
    /// Union of every `raw` line across all category stores.
    ///
    /// Missing, unreadable or corrupt stores count as empty and are logged.
    async fn load_all_raw(&self) -> HashSet<String>;

    /// Records of one category in stored order.
    async fn load(&self, category: Category) -> Result<Vec<BridgeRecord>>;

    /// Append one record to its category store, creating the store if needed.
    async fn append(&self, category: Category, record: &BridgeRecord) -> Result<()>;

    /// De-duplicate by `raw` and sort ascending. Returns the resulting count.
    ///
    /// Entries without a `bridge` line are kept, after the sorted ones.
    async fn normalize(&self, category: Category) -> Result<usize>;
}
