//! Locale type: validated language/region code.
//!
//! A `Locale` keys both the per-locale translation files on disk and the
//! per-locale values of dictionary records in the database.

use anyhow::{bail, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

static LOCALE_REGEX: OnceLock<Regex> = OnceLock::new();

/// A validated locale code (e.g. "en", "pl", "pt_BR").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale {
    code: String,
}

impl Locale {
    /// Create a locale from a code string.
    ///
    /// # Returns
    /// * `Ok(Locale)` if the code is a two or three letter language code,
    ///   optionally followed by `_` or `-` separated region/script subtags
    /// * `Err` otherwise
    pub fn from_code(code: &str) -> Result<Locale> {
        let regex = LOCALE_REGEX.get_or_init(|| {
            Regex::new(r"^[a-z]{2,3}([_-][A-Za-z0-9]{2,8})*$").unwrap()
        });

        let code = code.trim();
        if !regex.is_match(code) {
            bail!("Invalid locale code: '{}'", code);
        }

        Ok(Locale {
            code: code.to_string(),
        })
    }

    /// Parse a comma-separated list of codes, keeping the given order.
    ///
    /// Empty entries are ignored and duplicates keep their first position.
    pub fn parse_list(codes: &str) -> Result<Vec<Locale>> {
        let mut locales: Vec<Locale> = Vec::new();
        for code in codes.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            let locale = Locale::from_code(code)?;
            if !locales.contains(&locale) {
                locales.push(locale);
            }
        }
        Ok(locales)
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

impl TryFrom<String> for Locale {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Locale::from_code(&value)
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.code
    }
}
