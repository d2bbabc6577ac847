use crate::error::StoreError;
use crate::i18n::{Locale, LocaleProvider, TranslationNode};
use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, warn};

mod memory;

pub use memory::{FlushRecord, MemoryStore};

/// A dictionary entry: one translation key with at most one value per locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationRecord {
    pub identifier: String,
    pub values: BTreeMap<Locale, TranslationNode>,
}

impl TranslationRecord {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            values: BTreeMap::new(),
        }
    }

    /// Set the value for `locale`, replacing any previous one
    pub fn translate(&mut self, locale: Locale, value: TranslationNode) -> &mut Self {
        self.values.insert(locale, value);
        self
    }

    pub fn value_for(&self, locale: &Locale) -> Option<&TranslationNode> {
        self.values.get(locale)
    }
}

/// Database-resident dictionary with unit-of-work semantics.
///
/// `delete_batch` and `insert_batch` only stage changes; nothing reaches the
/// store until `flush`. `clear` releases whatever the store tracks between
/// flushes.
#[allow(async_fn_in_trait)]
pub trait DictionaryStore {
    async fn list_all(&self) -> Result<Vec<TranslationRecord>, StoreError>;

    async fn delete_batch(&mut self, records: &[TranslationRecord]) -> Result<(), StoreError>;

    async fn insert_batch(&mut self, records: Vec<TranslationRecord>) -> Result<(), StoreError>;

    async fn flush(&mut self) -> Result<(), StoreError>;

    fn clear(&mut self);
}

/// Staged change awaiting the next flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PendingChange {
    Delete(String),
    Insert(TranslationRecord),
}

/// SQLite-backed dictionary store.
pub struct Database {
    pool: SqlitePool,
    pending: Vec<PendingChange>,
}

impl Database {
    /// Open (or create) the database at `database_url` and create tables
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context(format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context(format!("Failed to open database at {}", database_url))?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database, mostly for tests and dry runs.
    ///
    /// A single connection that never expires keeps the data alive for the
    /// lifetime of the pool.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let db = Self {
            pool,
            pending: Vec::new(),
        };
        db.migrate().await?;
        Ok(db)
    }

    /// Create tables (safe to run always)
    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS dictionary (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                identifier TEXT NOT NULL UNIQUE
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create dictionary table")?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS dictionary_translation (
                dictionary_id INTEGER NOT NULL REFERENCES dictionary(id) ON DELETE CASCADE,
                locale TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (dictionary_id, locale)
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create dictionary_translation table")?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS locale (
                code TEXT PRIMARY KEY,
                enabled INTEGER NOT NULL DEFAULT 1,
                position INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create locale table")?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of staged changes not yet flushed
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of dictionary records
    pub async fn record_count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM dictionary")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    /// Add a locale or update its enabled flag and position
    pub async fn upsert_locale(&self, locale: &Locale, enabled: bool, position: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO locale (code, enabled, position) VALUES (?1, ?2, ?3)
             ON CONFLICT(code) DO UPDATE SET enabled = excluded.enabled, position = excluded.position",
        )
        .bind(locale.code())
        .bind(enabled)
        .bind(position)
        .execute(&self.pool)
        .await
        .context("Failed to save locale")?;
        Ok(())
    }

    async fn apply(&self, changes: Vec<PendingChange>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for change in changes {
            match change {
                PendingChange::Delete(identifier) => {
                    sqlx::query(
                        "DELETE FROM dictionary_translation WHERE dictionary_id IN (
                            SELECT id FROM dictionary WHERE identifier = ?1
                        )",
                    )
                    .bind(&identifier)
                    .execute(&mut *tx)
                    .await?;

                    sqlx::query("DELETE FROM dictionary WHERE identifier = ?1")
                        .bind(&identifier)
                        .execute(&mut *tx)
                        .await?;
                }
                PendingChange::Insert(record) => {
                    let dictionary_id = sqlx::query("INSERT INTO dictionary (identifier) VALUES (?1)")
                        .bind(&record.identifier)
                        .execute(&mut *tx)
                        .await?
                        .last_insert_rowid();

                    for (locale, value) in &record.values {
                        let encoded = serde_json::to_string(value).map_err(|source| StoreError::Encode {
                            identifier: record.identifier.clone(),
                            source,
                        })?;

                        sqlx::query(
                            "INSERT INTO dictionary_translation (dictionary_id, locale, value)
                             VALUES (?1, ?2, ?3)",
                        )
                        .bind(dictionary_id)
                        .bind(locale.code())
                        .bind(encoded)
                        .execute(&mut *tx)
                        .await?;
                    }
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

impl DictionaryStore for Database {
    async fn list_all(&self) -> Result<Vec<TranslationRecord>, StoreError> {
        let rows: Vec<(String, Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT d.identifier, t.locale, t.value
             FROM dictionary d
             LEFT JOIN dictionary_translation t ON t.dictionary_id = d.id
             ORDER BY d.identifier, t.locale",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut records: Vec<TranslationRecord> = Vec::new();

        for (identifier, locale, value) in rows {
            if records.last().map(|r| r.identifier != identifier).unwrap_or(true) {
                records.push(TranslationRecord::new(identifier.clone()));
            }
            let (Some(locale), Some(value)) = (locale, value) else {
                continue;
            };

            let parsed = match Locale::from_code(&locale) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Skipping stored value for '{}': {}", identifier, e);
                    continue;
                }
            };
            let node: TranslationNode =
                serde_json::from_str(&value).map_err(|source| StoreError::Decode {
                    identifier: identifier.clone(),
                    locale: locale.clone(),
                    source,
                })?;

            if let Some(record) = records.last_mut() {
                record.translate(parsed, node);
            }
        }

        Ok(records)
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
        if self.pending.is_empty() {
            return Ok(());
        }
        let changes = std::mem::take(&mut self.pending);
        let count = changes.len();
        self.apply(changes).await?;
        debug!("Flushed {} dictionary changes", count);
        Ok(())
    }

    fn clear(&mut self) {
        if !self.pending.is_empty() {
            warn!("Discarding {} unflushed dictionary changes", self.pending.len());
        }
        self.pending.clear();
    }
}

impl LocaleProvider for Database {
    async fn locales(&self) -> Result<Vec<Locale>> {
        let codes: Vec<String> = sqlx::query_scalar(
            "SELECT code FROM locale WHERE enabled = 1 ORDER BY position, code",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load locales")?;

        codes.iter().map(|code| Locale::from_code(code)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ==================== Helper Functions ====================

    async fn create_test_db() -> Database {
        Database::in_memory()
            .await
            .expect("Failed to create database")
    }

    fn locale(code: &str) -> Locale {
        Locale::from_code(code).unwrap()
    }

    fn record(identifier: &str, values: &[(&str, &str)]) -> TranslationRecord {
        let mut record = TranslationRecord::new(identifier);
        for (code, value) in values {
            record.translate(locale(code), TranslationNode::leaf(*value));
        }
        record
    }

    // ==================== Database Initialization Tests ====================

    #[tokio::test]
    async fn test_database_creation() {
        let db = create_test_db().await;
        assert_eq!(db.record_count().await.expect("count"), 0);
        assert!(db.list_all().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_database_reopening() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let url = format!("sqlite://{}", temp_dir.path().join("dictionary.db").display());

        {
            let mut db = Database::connect(&url).await.expect("create");
            db.insert_batch(vec![record("hello", &[("en", "Hello")])])
                .await
                .expect("stage");
            db.flush().await.expect("flush");
        }

        {
            let db = Database::connect(&url).await.expect("reopen");
            assert_eq!(db.record_count().await.expect("count"), 1, "Record should persist");
        }
    }

    #[tokio::test]
    async fn test_invalid_database_path() {
        let result = Database::connect("sqlite:///non/existent/path/db.db").await;
        assert!(result.is_err());
    }

    // ==================== Unit of Work Tests ====================

    #[tokio::test]
    async fn test_insert_is_staged_until_flush() {
        let mut db = create_test_db().await;

        db.insert_batch(vec![record("hello", &[("en", "Hello")])])
            .await
            .expect("stage");
        assert_eq!(db.pending_len(), 1);
        assert_eq!(db.record_count().await.expect("count"), 0);

        db.flush().await.expect("flush");
        assert_eq!(db.pending_len(), 0);
        assert_eq!(db.record_count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn test_list_all_roundtrips_values() {
        let mut db = create_test_db().await;

        let mut nested = TranslationRecord::new("cart");
        let mut children = crate::i18n::TranslationMap::new();
        children.insert("empty".to_string(), TranslationNode::leaf("Empty"));
        nested.translate(locale("en"), TranslationNode::Branch(children));

        db.insert_batch(vec![
            record("hello", &[("en", "Hello"), ("pl", "Cześć")]),
            nested.clone(),
        ])
        .await
        .expect("stage");
        db.flush().await.expect("flush");

        let records = db.list_all().await.expect("list");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], nested);
        assert_eq!(records[1], record("hello", &[("en", "Hello"), ("pl", "Cześć")]));
    }

    #[tokio::test]
    async fn test_record_without_values_is_listed() {
        let mut db = create_test_db().await;
        db.insert_batch(vec![TranslationRecord::new("orphan")])
            .await
            .expect("stage");
        db.flush().await.expect("flush");

        let records = db.list_all().await.expect("list");
        assert_eq!(records.len(), 1);
        assert!(records[0].values.is_empty());
    }

    #[tokio::test]
    async fn test_delete_batch_removes_records_and_values() {
        let mut db = create_test_db().await;
        db.insert_batch(vec![
            record("a", &[("en", "A")]),
            record("b", &[("en", "B")]),
        ])
        .await
        .expect("stage");
        db.flush().await.expect("flush");

        let existing = db.list_all().await.expect("list");
        db.delete_batch(&existing[..1]).await.expect("stage delete");
        db.flush().await.expect("flush");

        let remaining = db.list_all().await.expect("list");
        assert_eq!(remaining, vec![record("b", &[("en", "B")])]);

        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM dictionary_translation")
            .fetch_one(db.pool())
            .await
            .expect("count");
        assert_eq!(orphans, 1);
    }

    #[tokio::test]
    async fn test_flush_failure_rolls_back_batch() {
        let mut db = create_test_db().await;
        db.insert_batch(vec![record("dup", &[("en", "One")])])
            .await
            .expect("stage");
        db.flush().await.expect("flush");

        db.insert_batch(vec![record("fresh", &[("en", "Fresh")]), record("dup", &[("en", "Two")])])
            .await
            .expect("stage");
        let result = db.flush().await;
        assert!(matches!(result, Err(StoreError::Database(_))));

        let records = db.list_all().await.expect("list");
        assert_eq!(records, vec![record("dup", &[("en", "One")])]);
    }

    #[tokio::test]
    async fn test_flush_with_nothing_pending_is_noop() {
        let mut db = create_test_db().await;
        db.flush().await.expect("flush");
        assert_eq!(db.record_count().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn test_clear_discards_unflushed_changes() {
        let mut db = create_test_db().await;
        db.insert_batch(vec![record("a", &[("en", "A")])])
            .await
            .expect("stage");
        db.clear();
        db.flush().await.expect("flush");
        assert_eq!(db.record_count().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn test_corrupt_stored_value_is_decode_error() {
        let db = create_test_db().await;
        sqlx::query("INSERT INTO dictionary (id, identifier) VALUES (1, 'broken')")
            .execute(db.pool())
            .await
            .expect("insert");
        sqlx::query("INSERT INTO dictionary_translation (dictionary_id, locale, value) VALUES (1, 'en', 'not json')")
            .execute(db.pool())
            .await
            .expect("insert");

        let result = db.list_all().await;
        assert!(matches!(result, Err(StoreError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_sql_injection_prevention_identifier() {
        let mut db = create_test_db().await;
        let malicious = "x'); DROP TABLE dictionary; --";
        db.insert_batch(vec![record(malicious, &[("en", "X")])])
            .await
            .expect("stage");
        db.flush().await.expect("flush");

        let records = db.list_all().await.expect("list");
        assert_eq!(records[0].identifier, malicious);
    }

    // ==================== Locale Table Tests ====================

    #[tokio::test]
    async fn test_locales_ordered_by_position_and_enabled_only() {
        let db = create_test_db().await;
        db.upsert_locale(&locale("en"), true, 2).await.expect("en");
        db.upsert_locale(&locale("pl"), true, 1).await.expect("pl");
        db.upsert_locale(&locale("de"), false, 0).await.expect("de");

        let locales = db.locales().await.expect("locales");
        assert_eq!(locales, vec![locale("pl"), locale("en")]);
    }

    #[tokio::test]
    async fn test_upsert_locale_updates_existing() {
        let db = create_test_db().await;
        db.upsert_locale(&locale("en"), true, 0).await.expect("add");
        db.upsert_locale(&locale("en"), false, 0).await.expect("disable");

        assert!(db.locales().await.expect("locales").is_empty());
    }
}
