//! Reader configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, XmlTvError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Preferred `lang` for multilingual fields. Empty means no preference.
    #[serde(default)]
    pub language: Option<String>,
    /// Sniff the gzip magic bytes and decompress transparently
    #[serde(default = "default_true")]
    pub detect_gzip: bool,
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
}

fn default_true() -> bool { true }
fn default_buffer_capacity() -> usize { 64 * 1024 }

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            language: None,
            detect_gzip: true,
            buffer_capacity: 64 * 1024,
        }
    }
}

impl ReaderConfig {
    /// Language requirement as used by the resolver; `Some("")` collapses to `None`.
    pub fn preferred_language(&self) -> Option<&str> {
        self.language.as_deref().filter(|l| !l.is_empty())
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("xmltv_listings");
        path.push("config.json");
        path
    }

    /// Load from the per-user config file, or defaults when it is missing or invalid.
    pub fn load() -> Self {
        let path = Self::config_path();

        if path.exists() {
            if let Ok(config) = Self::load_from(&path) {
                return config;
            }
        }

        Self::default()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| XmlTvError::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| XmlTvError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| XmlTvError::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }
}
