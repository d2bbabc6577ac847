//! Dictionary synchronization: filesystem YAML ⇄ database dictionary.
//!
//! A run has three phases:
//!
//! 1. **Collect**: per locale, merge the translation file with the database
//!    values for that locale (database wins), write the merged tree back to
//!    the file, and record every key in an [`AggregateIndex`].
//! 2. **Purge**: delete every dictionary record in flushed batches.
//! 3. **Rebuild**: insert one record per aggregated key and flush once.
//!
//! Files are written before the database is touched. The purge and rebuild
//! phases are not atomic as a whole: a store failure during the purge leaves
//! the dictionary partially purged until the next successful run.

use crate::db::{DictionaryStore, TranslationRecord};
use crate::error::SyncError;
use crate::filesystem::YamlTranslationSource;
use crate::i18n::{merge_recursive, AggregateIndex, CoverageReport, Locale, TranslationMap};
use crate::report::SyncReport;
use std::num::NonZeroUsize;
use tracing::{debug, info, warn};

/// Records deleted per flush during the purge phase
pub const DEFAULT_PURGE_BATCH_SIZE: NonZeroUsize = match NonZeroUsize::new(20) {
    Some(size) => size,
    None => panic!("batch size must be non-zero"),
};

pub struct DictionarySynchronizer<S> {
    source: YamlTranslationSource,
    store: S,
    purge_batch_size: NonZeroUsize,
}

impl<S: DictionaryStore> DictionarySynchronizer<S> {
    pub fn new(source: YamlTranslationSource, store: S) -> Self {
        Self {
            source,
            store,
            purge_batch_size: DEFAULT_PURGE_BATCH_SIZE,
        }
    }

    pub fn with_purge_batch_size(mut self, batch_size: NonZeroUsize) -> Self {
        self.purge_batch_size = batch_size;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Synchronize the translation files of `locales` with the dictionary.
    ///
    /// With an empty locale list no file is written and the dictionary ends
    /// up empty.
    pub async fn synchronize(&mut self, locales: &[Locale]) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::started();
        info!(
            "Synchronizing dictionary for {} locales in {}",
            locales.len(),
            self.source.directory().display()
        );

        let index = self.collect(locales, &mut report).await?;
        report.keys_aggregated = index.len();

        report.coverage = CoverageReport::build(&index, locales);
        for (locale, keys) in &report.coverage.missing {
            warn!("Locale {} is missing {} translation keys", locale, keys.len());
        }
        for warning in &report.coverage.warnings {
            warn!("{}", warning);
        }

        self.purge(&mut report).await?;
        self.rebuild(index, &mut report).await?;

        let report = report.finish();
        info!("✓ Dictionary synchronized: {}", report.summary());
        Ok(report)
    }

    async fn collect(
        &self,
        locales: &[Locale],
        report: &mut SyncReport,
    ) -> Result<AggregateIndex, SyncError> {
        let records = self.store.list_all().await?;
        let mut index = AggregateIndex::new();

        for locale in locales {
            let merged = self.merge_locale(locale, &records, report).await?;
            index.absorb(locale, &merged);
            report.locales.push(locale.clone());
        }

        Ok(index)
    }

    async fn merge_locale(
        &self,
        locale: &Locale,
        records: &[TranslationRecord],
        report: &mut SyncReport,
    ) -> Result<TranslationMap, SyncError> {
        let path = self.source.path_for(locale);

        let from_files = self
            .source
            .read(locale)
            .await
            .map_err(|source| SyncError::SourceUnavailable {
                locale: locale.clone(),
                path: path.clone(),
                source,
            })?;
        let from_database = database_messages(records, locale);
        debug!(
            "Locale {}: {} keys on disk, {} keys in database",
            locale,
            from_files.len(),
            from_database.len()
        );

        let merged = merge_recursive(from_files, from_database);

        let written = self
            .source
            .write(locale, &merged)
            .await
            .map_err(|source| SyncError::PersistFailure {
                locale: locale.clone(),
                path,
                source,
            })?;
        report.files_written.push(written);

        Ok(merged)
    }

    async fn purge(&mut self, report: &mut SyncReport) -> Result<(), SyncError> {
        let existing = self.store.list_all().await?;
        let total = existing.len();
        let batch_size = self.purge_batch_size.get();

        for batch in existing.chunks(batch_size) {
            self.store.delete_batch(batch).await?;
            if let Err(e) = self.store.flush().await {
                warn!(
                    "Purge interrupted after {} of {} records; dictionary is partially purged until the next successful run",
                    report.records_deleted, total
                );
                return Err(e.into());
            }
            self.store.clear();

            report.records_deleted += batch.len();
            report.delete_batches += 1;
            debug!(
                "Purged batch {} ({} records, {}/{})",
                report.delete_batches,
                batch.len(),
                report.records_deleted,
                total
            );
        }

        Ok(())
    }

    async fn rebuild(&mut self, index: AggregateIndex, report: &mut SyncReport) -> Result<(), SyncError> {
        let records: Vec<TranslationRecord> = index
            .into_iter()
            .map(|(identifier, values)| TranslationRecord { identifier, values })
            .collect();
        let count = records.len();

        self.store.insert_batch(records).await?;
        self.store.flush().await?;

        report.records_inserted = count;
        Ok(())
    }
}

/// Project the database records onto one locale.
///
/// Records without a value for `locale` are skipped.
pub fn database_messages(records: &[TranslationRecord], locale: &Locale) -> TranslationMap {
    records
        .iter()
        .filter_map(|record| {
            record
                .value_for(locale)
                .map(|value| (record.identifier.clone(), value.clone()))
        })
        .collect()
}
