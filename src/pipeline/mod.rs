//! Pipeline entry points.
//!
//! - `run_cycle`: fetch bridge lines, reconcile them with the stores, notify
//! - `run_normalize_all`: de-duplicate and sort every category store

pub mod normalize;
pub mod reconcile;
pub mod run;

pub use normalize::{NormalizeOutcome, run_normalize_all};
pub use reconcile::reconcile;
pub use run::{RunSummary, run_cycle};
