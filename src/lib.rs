//! Synchronizes YAML translation files with a database-backed translation
//! dictionary.
//!
//! Each run merges every locale's translation file with the database values
//! for that locale (database wins), writes the merged tree back to disk, and
//! then replaces the whole dictionary with the merged result.

pub mod config;
pub mod db;
pub mod error;
pub mod filesystem;
pub mod i18n;
pub mod report;
pub mod retry;
pub mod scheduler;
pub mod sync;

pub use error::{SourceError, StoreError, SyncError};
pub use report::SyncReport;
pub use sync::DictionarySynchronizer;
