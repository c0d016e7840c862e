//! Service layer for the bridge watcher.
//!
//! This module contains:
//! - Bridge line classification (`classifier`)
//! - Bridge line sources (`BridgeSource`, `HttpBridgeSource`)
//! - Operator notifications (`Notifier`, `TelegramNotifier`, `LogNotifier`)

pub mod classifier;
pub mod notifier;
pub mod source;

pub use classifier::classify;
pub use notifier::{LogNotifier, Notifier, TelegramNotifier};
pub use source::{BridgeSource, HttpBridgeSource};
