//! Translation coverage checks over an aggregate index.
//!
//! After a sync every key is expected to exist in every locale, and every
//! translated message is expected to keep the placeholders (`%name%`,
//! `{{ name }}`) of its counterparts in other locales. Gaps are reported,
//! never fixed.

use crate::i18n::{AggregateIndex, Locale, TranslationNode};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// Coverage report for one synchronization run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    /// Keys that exist in at least one locale but are missing in this one
    pub missing: BTreeMap<Locale, Vec<String>>,

    /// Human-readable placeholder mismatch warnings
    pub warnings: Vec<String>,
}

static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

impl CoverageReport {
    /// Build the coverage report for `index` against the locales of the run.
    pub fn build(index: &AggregateIndex, locales: &[Locale]) -> Self {
        let mut report = CoverageReport::default();

        for (key, values) in index.iter() {
            for locale in locales {
                if !values.contains_key(locale) {
                    report
                        .missing
                        .entry(locale.clone())
                        .or_default()
                        .push(key.clone());
                }
            }

            report.check_placeholders(key, values);
        }

        report
    }

    /// Check if every key exists in every locale
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Check if the report is clean (no gaps and no warnings)
    pub fn is_clean(&self) -> bool {
        self.is_complete() && self.warnings.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.missing.values().map(Vec::len).sum()
    }

    fn check_placeholders(&mut self, key: &str, values: &BTreeMap<Locale, TranslationNode>) {
        let mut per_path: BTreeMap<String, Vec<(&Locale, BTreeSet<String>)>> = BTreeMap::new();

        for (locale, node) in values {
            let mut leaves = Vec::new();
            flatten(key, node, &mut leaves);
            for (path, text) in leaves {
                per_path
                    .entry(path)
                    .or_default()
                    .push((locale, extract_placeholders(text)));
            }
        }

        for (path, entries) in per_path {
            let Some((first_locale, expected)) = entries.first() else {
                continue;
            };
            for (locale, found) in entries.iter().skip(1) {
                if found != expected {
                    self.warnings.push(format!(
                        "Placeholder mismatch for '{}': {} has {:?}, {} has {:?}",
                        path, first_locale, expected, locale, found
                    ));
                }
            }
        }
    }
}

fn flatten<'a>(path: &str, node: &'a TranslationNode, out: &mut Vec<(String, &'a str)>) {
    match node {
        TranslationNode::Leaf(text) => out.push((path.to_string(), text.as_str())),
        TranslationNode::Branch(children) => {
            for (key, child) in children {
                flatten(&format!("{}.{}", path, key), child, out);
            }
        }
    }
}

/// Extract `%name%` and `{{ name }}` placeholders from a message
fn extract_placeholders(text: &str) -> BTreeSet<String> {
    let regex = PLACEHOLDER_REGEX
        .get_or_init(|| Regex::new(r"%[A-Za-z0-9_.]+%|\{\{\s*[A-Za-z0-9_.]+\s*\}\}").unwrap());

    regex
        .find_iter(text)
        .map(|m| m.as_str().split_whitespace().collect::<String>())
        .collect()
}
