//! Run report for a dictionary synchronization.

use crate::i18n::{CoverageReport, Locale};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// What one synchronization run did.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Locales processed, in processing order
    pub locales: Vec<Locale>,

    /// Translation files written, one per locale
    pub files_written: Vec<PathBuf>,

    /// Distinct translation keys in the aggregate
    pub keys_aggregated: usize,

    /// Records removed during the purge phase
    pub records_deleted: usize,

    /// Flushed delete batches
    pub delete_batches: usize,

    /// Records created from the aggregate
    pub records_inserted: usize,

    /// Missing keys and placeholder mismatches across locales
    pub coverage: CoverageReport,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    pub(crate) fn started() -> Self {
        Self {
            locales: Vec::new(),
            files_written: Vec::new(),
            keys_aggregated: 0,
            records_deleted: 0,
            delete_batches: 0,
            records_inserted: 0,
            coverage: CoverageReport::default(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    /// Wall-clock duration of the run in milliseconds
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{} locales, {} keys, {} records deleted in {} batches, {} records inserted, {} missing translations ({} ms)",
            self.locales.len(),
            self.keys_aggregated,
            self.records_deleted,
            self.delete_batches,
            self.records_inserted,
            self.coverage.missing_count(),
            self.duration_ms()
        )
    }
}
