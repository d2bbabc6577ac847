use crate::i18n::{Locale, TreeError};
use std::path::PathBuf;
use thiserror::Error;

/// Why a locale's translation file could not be loaded.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported structure: {0}")]
    Structure(#[from] TreeError),
}

/// Failures raised by a `DictionaryStore`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored value for '{identifier}' ({locale}) is not valid: {source}")]
    Decode {
        identifier: String,
        locale: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode value for '{identifier}': {source}")]
    Encode {
        identifier: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failures of a synchronization run. Every variant aborts the whole run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A translation file exists but cannot be read or parsed. Raised before
    /// any database mutation.
    #[error("translations for locale '{locale}' at {} are unavailable: {source}", path.display())]
    SourceUnavailable {
        locale: Locale,
        path: PathBuf,
        #[source]
        source: SourceError,
    },

    /// A merged translation file could not be written. Files of locales
    /// processed earlier in the run stay overwritten.
    #[error("failed to write translations for locale '{locale}' to {}: {source}", path.display())]
    PersistFailure {
        locale: Locale,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A database list/delete/insert/flush failed. During the purge phase
    /// this leaves the dictionary partially purged.
    #[error("dictionary store failure: {0}")]
    StoreFailure(#[from] StoreError),
}

impl SyncError {
    /// Whether re-running the whole synchronization may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SyncError::SourceUnavailable { .. })
    }
}
