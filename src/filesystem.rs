//! YAML translation files: one `<domain>.<locale>.yml` file per locale.

use crate::error::SourceError;
use crate::i18n::{from_yaml, Locale, TranslationMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Filesystem-resident translation source.
#[derive(Debug, Clone)]
pub struct YamlTranslationSource {
    directory: PathBuf,
    domain: String,
}

impl YamlTranslationSource {
    pub fn new(directory: impl Into<PathBuf>, domain: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            domain: domain.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the translation file for `locale`
    pub fn path_for(&self, locale: &Locale) -> PathBuf {
        self.directory
            .join(format!("{}.{}.yml", self.domain, locale.code()))
    }

    /// Load the translations of `locale`.
    ///
    /// A missing file is an empty mapping. An unreadable file, invalid YAML
    /// or a document that is not a nested mapping of strings is an error.
    pub async fn read(&self, locale: &Locale) -> Result<TranslationMap, SourceError> {
        let path = self.path_for(locale);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No translation file at {}, starting empty", path.display());
                return Ok(TranslationMap::new());
            }
            Err(e) => return Err(SourceError::Io(e)),
        };

        let document: serde_yaml::Value = serde_yaml::from_str(&content)?;
        Ok(from_yaml(document)?)
    }

    /// Overwrite the translation file of `locale` with `messages`,
    /// creating parent directories as needed.
    pub async fn write(&self, locale: &Locale, messages: &TranslationMap) -> std::io::Result<PathBuf> {
        let path = self.path_for(locale);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = if messages.is_empty() {
            "{}\n".to_string()
        } else {
            serde_yaml::to_string(messages)
                .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?
        };

        tokio::fs::write(&path, content).await?;
        debug!("Wrote {} top-level keys to {}", messages.len(), path.display());

        Ok(path)
    }
}
