//! Process-wide holder for the most recently published dataset.
//!
//! One dataset is shared by every reader; each reader builds its own session
//! (cursor, position, ledger) on top. Publishing takes the write lock, so at
//! most one writer replaces the dataset at a time, and readers only ever see
//! a complete dataset, never a partially built one.

use std::sync::{Arc, PoisonError, RwLock};

use super::ingest::Dataset;

/// Cloneable handle to the shared dataset slot.
#[derive(Debug, Clone, Default)]
pub struct DatasetStore {
    slot: Arc<RwLock<Option<Arc<Dataset>>>>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the shared dataset. Returns the dataset as now shared.
    pub fn publish(&self, dataset: Dataset) -> Arc<Dataset> {
        let dataset = Arc::new(dataset);
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::clone(&dataset));
        tracing::info!(bars = dataset.len(), fingerprint = %dataset.fingerprint, "published dataset");
        dataset
    }

    /// The latest published dataset, if any.
    pub fn latest(&self) -> Option<Arc<Dataset>> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn clear(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ingest_table, IngestOptions, Normalizer, RawTable};

    fn dataset(close: &str) -> Dataset {
        let text = format!("Open,High,Low,Close\n1,2,0.5,{close}\n");
        let table = RawTable::parse(&text).unwrap();
        ingest_table(table, &Normalizer::new(), &IngestOptions::default()).unwrap()
    }

    #[test]
    fn empty_until_published() {
        let store = DatasetStore::new();
        assert!(store.latest().is_none());
        store.publish(dataset("1.5"));
        assert_eq!(store.latest().unwrap().len(), 1);
        store.clear();
        assert!(store.latest().is_none());
    }

    #[test]
    fn clones_share_the_slot() {
        let store = DatasetStore::new();
        let reader = store.clone();
        let first = store.publish(dataset("1.5"));
        store.publish(dataset("1.6"));

        let latest = reader.latest().unwrap();
        assert_ne!(latest.fingerprint, first.fingerprint);
        // Earlier handles stay valid after replacement.
        assert_eq!(first.bars.get(0).unwrap().close, 1.5);
    }

    #[test]
    fn readers_on_other_threads_see_published_data() {
        let store = DatasetStore::new();
        store.publish(dataset("1.5"));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.latest().map(|d| d.len()))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Some(1));
        }
    }
}
