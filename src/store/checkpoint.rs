use std::path::{Path, PathBuf};

use tracing::info;

use crate::app::Result;
use crate::store::{write_records, OutputConfig, ReviewStore};

/// Periodically snapshots the whole review store to one CSV file.
///
/// Each snapshot overwrites the previous one, so the file always holds every
/// record accumulated so far exactly once.
pub struct Checkpointer {
    path: Option<PathBuf>,
    every: usize,
    flushed_len: usize,
    output: OutputConfig,
}

impl Checkpointer {
    pub fn new(path: Option<PathBuf>, every: usize, output: OutputConfig) -> Self {
        Self {
            path,
            every: every.max(1),
            flushed_len: 0,
            output,
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, 1, OutputConfig::default())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Snapshot when the store has crossed another multiple of the batch size
    /// since the last snapshot.
    pub fn maybe_flush(&mut self, store: &ReviewStore) -> Result<bool> {
        if store.len() / self.every > self.flushed_len / self.every {
            self.flush(store)
        } else {
            Ok(false)
        }
    }

    /// Snapshot unconditionally. Does nothing when no path is configured or
    /// the store is empty.
    pub fn flush(&mut self, store: &ReviewStore) -> Result<bool> {
        let Some(path) = self.path.as_deref() else {
            return Ok(false);
        };
        if store.is_empty() {
            return Ok(false);
        }

        write_records(path, store.records(), &self.output)?;
        self.flushed_len = store.len();
        info!("Checkpoint: {} records written to {}", store.len(), path.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ReviewRecord;
    use crate::store::read_rows;

    fn fill(store: &mut ReviewStore, from: usize, to: usize) {
        for i in from..to {
            store.insert(ReviewRecord::new(
                Some(&i.to_string()),
                format!("u{i}"),
                "body",
                "",
                "",
                120,
            ));
        }
    }

    #[test]
    fn test_flushes_on_crossing_batch_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt.csv");
        let mut checkpointer = Checkpointer::new(Some(path.clone()), 100, OutputConfig::default());
        let mut store = ReviewStore::new();

        fill(&mut store, 0, 95);
        assert!(!checkpointer.maybe_flush(&store).unwrap());
        assert!(!path.exists());

        fill(&mut store, 95, 107);
        assert!(checkpointer.maybe_flush(&store).unwrap());
        assert_eq!(read_rows(&path).unwrap().len(), 108);

        fill(&mut store, 107, 150);
        assert!(!checkpointer.maybe_flush(&store).unwrap());

        fill(&mut store, 150, 200);
        assert!(checkpointer.maybe_flush(&store).unwrap());
        assert_eq!(read_rows(&path).unwrap().len(), 201);
    }

    #[test]
    fn test_repeated_flushes_do_not_duplicate_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt.csv");
        let mut checkpointer = Checkpointer::new(Some(path.clone()), 10, OutputConfig::default());
        let mut store = ReviewStore::new();

        fill(&mut store, 0, 12);
        checkpointer.flush(&store).unwrap();
        checkpointer.flush(&store).unwrap();
        fill(&mut store, 12, 15);
        checkpointer.flush(&store).unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 16);
        assert_eq!(rows[15][0], "u14");
    }

    #[test]
    fn test_disabled_and_empty_flushes_are_noops() {
        let mut store = ReviewStore::new();
        let mut disabled = Checkpointer::disabled();
        fill(&mut store, 0, 3);
        assert!(!disabled.flush(&store).unwrap());
        assert!(disabled.path().is_none());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt.csv");
        let mut enabled = Checkpointer::new(Some(path.clone()), 10, OutputConfig::default());
        assert!(!enabled.flush(&ReviewStore::new()).unwrap());
        assert!(!path.exists());
    }
}
