// src/pipeline/run.rs

//! One fetch, reconcile and notify cycle.

use std::time::Duration;

use crate::error::Result;
use crate::models::{Config, Report};
use crate::services::notifier::{
    DUPLICATE_TITLE, NEW_TITLE, Notifier, render_grouped, render_malformed,
};
use crate::services::source::BridgeSource;
use crate::storage::BridgeStore;
use crate::utils::logging;

use super::reconcile::reconcile;

/// Outcome of a single run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Candidate lines returned by all sources
    pub fetched: usize,
    /// No source produced any line; nothing was reconciled
    pub fetch_failed: bool,
    pub report: Report,
}

/// Run one cycle: fetch, reconcile against the stores, notify.
///
/// Messages go out in a fixed order: new bridges, then (after the pacing
/// delay) duplicates, then malformed lines. An empty fetch sends a single
/// failure message instead.
pub async fn run_cycle(
    config: &Config,
    source: &dyn BridgeSource,
    store: &dyn BridgeStore,
    notifier: &dyn Notifier,
) -> Result<RunSummary> {
    logging::header("Bridge run starting");

    let existing = store.load_all_raw().await;
    log::info!("Loaded {} known bridge(s)", existing.len());

    let lines = source.fetch_all(&config.sources).await;
    if lines.is_empty() {
        log::error!("No bridge lines fetched from any source");
        notifier.notify_failure().await?;
        return Ok(RunSummary {
            fetch_failed: true,
            ..RunSummary::default()
        });
    }

    let report = reconcile(store, &lines, &existing).await?;

    if let Some(message) = render_grouped(NEW_TITLE, &report.new_by_category) {
        notifier.notify(&message).await?;
        let pacing = Duration::from_millis(config.notifier.pacing_delay_ms);
        if !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }
    }
    if let Some(message) = render_grouped(DUPLICATE_TITLE, &report.duplicate_by_category) {
        notifier.notify(&message).await?;
    }
    if let Some(message) = render_malformed(&report.malformed) {
        notifier.notify(&message).await?;
    }

    let summary = RunSummary {
        fetched: lines.len(),
        fetch_failed: false,
        report,
    };
    logging::summary(
        "Bridge run",
        &[
            ("Fetched", summary.fetched.to_string()),
            ("New", summary.report.new_count().to_string()),
            ("Duplicate", summary.report.duplicate_count().to_string()),
            ("Malformed", summary.report.malformed_count().to_string()),
        ],
    );
    Ok(summary)
}
