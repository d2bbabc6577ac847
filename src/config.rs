use crate::i18n::ConfiguredLocales;
use anyhow::{bail, Context, Result};
use std::num::NonZeroUsize;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // Translation files
    pub translations_dir: PathBuf,
    pub translation_domain: String,

    // Locales (None = read the locale table)
    pub locales: Option<ConfiguredLocales>,

    // Synchronization
    pub purge_batch_size: NonZeroUsize,
    pub max_attempts: u32,

    // Scheduling (empty = run once and exit)
    pub schedule_times: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL not set")?,

            translations_dir: std::env::var("TRANSLATIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("app/Resources/translations")),
            translation_domain: std::env::var("TRANSLATION_DOMAIN")
                .unwrap_or_else(|_| "messages".to_string()),

            locales: match std::env::var("LOCALES") {
                Ok(codes) if !codes.trim().is_empty() => {
                    Some(ConfiguredLocales::from_list(&codes).context("Invalid LOCALES")?)
                }
                _ => None,
            },

            purge_batch_size: match std::env::var("PURGE_BATCH_SIZE") {
                Ok(value) => parse_batch_size(&value)?,
                Err(_) => crate::sync::DEFAULT_PURGE_BATCH_SIZE,
            },
            max_attempts: std::env::var("SYNC_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|attempts| *attempts >= 1)
                .unwrap_or(3),

            schedule_times: std::env::var("SYNC_SCHEDULE")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    /// Whether the binary should keep running and sync on a schedule
    pub fn is_scheduled(&self) -> bool {
        !self.schedule_times.is_empty()
    }
}

fn parse_batch_size(value: &str) -> Result<NonZeroUsize> {
    let parsed: usize = value
        .trim()
        .parse()
        .context(format!("PURGE_BATCH_SIZE must be a number, got '{}'", value))?;
    match NonZeroUsize::new(parsed) {
        Some(size) => Ok(size),
        None => bail!("PURGE_BATCH_SIZE must be greater than zero"),
    }
}
