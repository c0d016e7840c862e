// src/pipeline/reconcile.rs

//! Reconciliation of fetched lines against the known bridges.

use std::collections::HashSet;

use crate::error::Result;
use crate::models::Report;
use crate::services::classifier::classify;
use crate::storage::BridgeStore;

/// Partition `raw_lines` into new, duplicate and malformed lines.
///
/// New lines are appended to their category store as they are found. Lines
/// are processed in input order; a repeat of a line added earlier in the
/// same batch is reported as a duplicate and not appended twice.
///
/// A store write failure aborts the batch and is returned to the caller.
pub async fn reconcile(
    store: &dyn BridgeStore,
    raw_lines: &[String],
    existing_raw: &HashSet<String>,
) -> Result<Report> {
    let mut report = Report::default();
    let mut added: HashSet<String> = HashSet::new();

    for line in raw_lines {
        let Some(record) = classify(line) else {
            log::debug!("Malformed bridge line: {}", line);
            report.push_malformed(line.as_str());
            continue;
        };

        let category = record.category();
        if existing_raw.contains(&record.raw) || added.contains(&record.raw) {
            report.push_duplicate(category, record.raw);
            continue;
        }

        store.append(category, &record).await?;
        log::info!("New {} bridge: {}", category, record.raw);
        added.insert(record.raw.clone());
        report.push_new(category, record.raw);
    }

    Ok(report)
}
