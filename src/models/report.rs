//! Outcome of reconciling one fetched batch against the stores.

use std::collections::BTreeMap;

use serde::Serialize;

use super::Category;

/// Raw lines of one batch, partitioned by outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Lines appended to a store during this batch
    pub new_by_category: BTreeMap<Category, Vec<String>>,
    /// Lines already known before (or earlier in) this batch
    pub duplicate_by_category: BTreeMap<Category, Vec<String>>,
    /// Lines the classifier rejected
    pub malformed: Vec<String>,
}

impl Report {
    pub fn push_new(&mut self, category: Category, raw: impl Into<String>) {
        self.new_by_category
            .entry(category)
            .or_default()
            .push(raw.into());
    }

    pub fn push_duplicate(&mut self, category: Category, raw: impl Into<String>) {
        self.duplicate_by_category
            .entry(category)
            .or_default()
            .push(raw.into());
    }

    pub fn push_malformed(&mut self, raw: impl Into<String>) {
        self.malformed.push(raw.into());
    }

    pub fn new_count(&self) -> usize {
        self.new_by_category.values().map(Vec::len).sum()
    }

    pub fn duplicate_count(&self) -> usize {
        self.duplicate_by_category.values().map(Vec::len).sum()
    }

    pub fn malformed_count(&self) -> usize {
        self.malformed.len()
    }
}
