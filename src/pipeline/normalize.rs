// src/pipeline/normalize.rs

//! Store maintenance: de-duplicate and sort every category store.

use std::collections::BTreeMap;

use crate::models::Category;
use crate::storage::BridgeStore;
use crate::utils::logging;

/// Result of normalizing all stores.
#[derive(Debug, Default)]
pub struct NormalizeOutcome {
    /// Record count per store after normalization
    pub counts: BTreeMap<Category, usize>,
    /// Stores that could not be normalized
    pub failed: Vec<Category>,
}

/// Normalize every category store, creating missing ones.
///
/// A failing store is logged and skipped; the others are still processed.
pub async fn run_normalize_all(store: &dyn BridgeStore) -> NormalizeOutcome {
    logging::header("Normalizing bridge stores");

    let mut outcome = NormalizeOutcome::default();
    for category in Category::ALL {
        match store.normalize(category).await {
            Ok(count) => {
                logging::sub_item(&format!("{}: {} bridge(s)", category, count));
                outcome.counts.insert(category, count);
            }
            Err(e) => {
                log::error!("Failed to normalize {}: {}", category, e);
                outcome.failed.push(category);
            }
        }
    }
    outcome
}
