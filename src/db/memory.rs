//! In-process dictionary store.
//!
//! Behaves like `Database` (changes are staged until `flush`) and keeps a
//! history of every flush so batch behaviour can be observed.

use super::{DictionaryStore, PendingChange, TranslationRecord};
use crate::error::StoreError;
use std::collections::BTreeMap;

/// What a single successful flush committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushRecord {
    pub deleted: usize,
    pub inserted: usize,
    /// Records in the store right after the flush
    pub total_after: usize,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<String, TranslationRecord>,
    pending: Vec<PendingChange>,
    flushes: Vec<FlushRecord>,
    clear_count: usize,
    fail_after_flushes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with committed records
    pub fn with_records(records: impl IntoIterator<Item = TranslationRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.identifier.clone(), record))
                .collect(),
            ..Self::default()
        }
    }

    /// Make every flush after the first `successful` ones fail
    pub fn fail_after_flushes(mut self, successful: usize) -> Self {
        self.fail_after_flushes = Some(successful);
        self
    }

    pub fn records(&self) -> Vec<&TranslationRecord> {
        self.records.values().collect()
    }

    pub fn get(&self, identifier: &str) -> Option<&TranslationRecord> {
        self.records.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn flushes(&self) -> &[FlushRecord] {
        &self.flushes
    }

    pub fn clear_count(&self) -> usize {
        self.clear_count
    }
}

impl DictionaryStore for MemoryStore {
    async fn list_all(&self) -> Result<Vec<TranslationRecord>, StoreError> {
        Ok(self.records.values().cloned().collect())
    }

    async fn delete_batch(&mut self, records: &[TranslationRecord]) -> Result<(), StoreError> {
        self.pending.extend(
            records
                .iter()
                .map(|record| PendingChange::Delete(record.identifier.clone())),
        );
        Ok(())
    }

    async fn insert_batch(&mut self, records: Vec<TranslationRecord>) -> Result<(), StoreError> {
        self.pending
            .extend(records.into_iter().map(PendingChange::Insert));
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), StoreError> {
        if let Some(limit) = self.fail_after_flushes {
            if self.flushes.len() >= limit {
                self.pending.clear();
                return Err(StoreError::Unavailable(format!(
                    "flush {} rejected",
                    self.flushes.len() + 1
                )));
            }
        }

        let mut staged = self.records.clone();
        let mut deleted = 0;
        let mut inserted = 0;

        for change in std::mem::take(&mut self.pending) {
            match change {
                PendingChange::Delete(identifier) => {
                    if staged.remove(&identifier).is_some() {
                        deleted += 1;
                    }
                }
                PendingChange::Insert(record) => {
                    if staged.contains_key(&record.identifier) {
                        return Err(StoreError::Unavailable(format!(
                            "duplicate identifier '{}'",
                            record.identifier
                        )));
                    }
                    staged.insert(record.identifier.clone(), record);
                    inserted += 1;
                }
            }
        }

        self.records = staged;
        self.flushes.push(FlushRecord {
            deleted,
            inserted,
            total_after: self.records.len(),
        });
        Ok(())
    }

    fn clear(&mut self) {
        self.pending.clear();
        self.clear_count += 1;
    }
}
