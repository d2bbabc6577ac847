//! Locale providers: where the ordered list of locales to synchronize comes from.
//!
//! Locales either come from configuration (`LOCALES=en,pl`) or from the
//! `locale` table of the dictionary database (see `crate::db::Database`).

use crate::i18n::Locale;
use anyhow::{bail, Result};

/// Source of the ordered locale sequence for a synchronization run.
///
/// The order returned is the processing order and must be deterministic.
#[allow(async_fn_in_trait)]
pub trait LocaleProvider {
    async fn locales(&self) -> Result<Vec<Locale>>;
}

/// Fixed locale list taken from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredLocales {
    locales: Vec<Locale>,
}

impl ConfiguredLocales {
    /// Parse a comma-separated list of locale codes.
    ///
    /// # Returns
    /// * `Ok(ConfiguredLocales)` if every code is valid and at least one is given
    /// * `Err` if a code is invalid or the list is empty
    pub fn from_list(codes: &str) -> Result<Self> {
        let locales = Locale::parse_list(codes)?;
        if locales.is_empty() {
            bail!("Locale list is empty");
        }
        Ok(Self { locales })
    }
}

impl LocaleProvider for ConfiguredLocales {
    async fn locales(&self) -> Result<Vec<Locale>> {
        Ok(self.locales.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_configured_locales_keep_order() {
        let provider = ConfiguredLocales::from_list("pl,en,de").expect("valid");
        let locales = provider.locales().await.expect("locales");

        let codes: Vec<&str> = locales.iter().map(|l| l.code()).collect();
        assert_eq!(codes, vec!["pl", "en", "de"]);
    }

    #[test]
    fn test_from_list_empty_is_error() {
        assert!(ConfiguredLocales::from_list("").is_err());
        assert!(ConfiguredLocales::from_list(" , ,").is_err());
    }

    #[test]
    fn test_from_list_invalid_code_is_error() {
        assert!(ConfiguredLocales::from_list("en,Polish").is_err());
    }
}
