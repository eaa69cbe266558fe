pub mod checkpoint;
pub mod output;
pub mod history;

use std::collections::HashSet;

use crate::domain::ReviewRecord;

pub use checkpoint::Checkpointer;
pub use output::{read_rows, write_records, ColumnNames, OutputConfig};
pub use history::{RunLog, RunRecord, RunStatus, SqliteRunLog};

/// Append-only, insertion-ordered set of review records keyed by identity.
#[derive(Debug, Default)]
pub struct ReviewStore {
    records: Vec<ReviewRecord>,
    identities: HashSet<String>,
}

impl ReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `record` unless its identity is already held; true if appended.
    pub fn insert(&mut self, record: ReviewRecord) -> bool {
        if !self.identities.insert(record.identity.clone()) {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.identities.contains(identity)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in discovery order.
    pub fn records(&self) -> &[ReviewRecord] {
        &self.records
    }

    /// Page-provided ids held so far, for skipping known cards in the page.
    pub fn stable_ids(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| r.has_stable_id())
            .filter_map(|r| r.identity.split_once("::").map(|(_, id)| id.to_string()))
            .collect()
    }

    /// The first `limit` records, in discovery order.
    pub fn truncated(&self, limit: usize) -> Vec<ReviewRecord> {
        self.records.iter().take(limit).cloned().collect()
    }
}
