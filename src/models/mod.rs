// src/models/mod.rs

//! Domain models for the bridge watcher.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod bridge;
mod config;
mod report;

// Re-export all public types
pub use bridge::{AddressFamily, BridgeRecord, Category, Transport, TransportArgs};
pub use config::{
    Config, ENV_BOT_TOKEN, ENV_CHAT_ID, ENV_STORE_DIR, FetchConfig, NotifierConfig, SourceConfig,
    StorageConfig,
};
pub use report::Report;
