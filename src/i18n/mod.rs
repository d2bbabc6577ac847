//! Translation data model shared by the filesystem source, the database store
//! and the synchronizer.
//!
//! # Architecture
//!
//! - `locale`: validated `Locale` code type
//! - `registry`: `LocaleProvider` trait and the configuration-backed provider
//! - `tree`: nested translation values and the recursive merge
//! - `aggregate`: key → (locale → value) index built during a sync
//! - `coverage`: missing-key and placeholder checks over the aggregate
//!
//! # Example
//!
//! ```rust,ignore
//! use dictionary_sync::i18n::{merge_recursive, Locale};
//!
//! let pl = Locale::from_code("pl")?;
//! let merged = merge_recursive(filesystem_messages, database_messages);
//! ```

mod aggregate;
mod coverage;
mod locale;
mod registry;
mod tree;

pub use aggregate::AggregateIndex;
pub use coverage::CoverageReport;
pub use locale::Locale;
pub use registry::{ConfiguredLocales, LocaleProvider};
pub use tree::{from_yaml, merge_recursive, TranslationMap, TranslationNode, TreeError};
