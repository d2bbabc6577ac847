//! Aggregate index: every translation key with its value per locale.
//!
//! The index is built from per-locale merge results and consumed once when
//! the database dictionary is rebuilt.

use crate::i18n::{Locale, TranslationMap, TranslationNode};
use std::collections::BTreeMap;

/// Mapping from translation key to (locale → merged value).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateIndex {
    entries: BTreeMap<String, BTreeMap<Locale, TranslationNode>>,
}

impl AggregateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every top-level entry of a locale's merged set.
    ///
    /// A later call for the same locale overwrites that locale's values.
    pub fn absorb(&mut self, locale: &Locale, merged: &TranslationMap) {
        for (key, value) in merged {
            self.entries
                .entry(key.clone())
                .or_default()
                .insert(locale.clone(), value.clone());
        }
    }

    /// Combine per-locale partial indexes built independently.
    pub fn extend(&mut self, other: AggregateIndex) {
        for (key, values) in other.entries {
            self.entries.entry(key).or_default().extend(values);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&BTreeMap<Locale, TranslationNode>> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<Locale, TranslationNode>)> {
        self.entries.iter()
    }
}

impl IntoIterator for AggregateIndex {
    type Item = (String, BTreeMap<Locale, TranslationNode>);
    type IntoIter = std::collections::btree_map::IntoIter<String, BTreeMap<Locale, TranslationNode>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
