//! File-based configuration for the command-line front end.
//!
//! Persisted as TOML. Every field except `sources` has a default, so a
//! minimal file is just:
//!
//! ```toml
//! sources = ["https://example.org/tree/root"]
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::autocomplete::AutoCompleteConfig;
use crate::error::ConfigError;

/// Ready-made similarity vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PresetName {
    #[default]
    Strict,
    Fuzzy,
}

/// Search configuration, persisted as TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Root document URIs, one per tree.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Number of results to keep.
    #[serde(default = "default_size")]
    pub size: usize,
    #[serde(default)]
    pub preset: PresetName,
    /// Per-document HTTP timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Documents larger than this fail to fetch and are skipped.
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: u64,
    /// Load every root's relations before the first query.
    #[serde(default)]
    pub prefetch: bool,
    #[serde(default = "default_use_store")]
    pub use_store: bool,
}

fn default_size() -> usize {
    10
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_max_document_bytes() -> u64 {
    8 * 1024 * 1024
}
fn default_use_store() -> bool {
    true
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            size: default_size(),
            preset: PresetName::default(),
            timeout_secs: default_timeout_secs(),
            max_document_bytes: default_max_document_bytes(),
            prefetch: false,
            use_store: default_use_store(),
        }
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the pipeline configuration. Validation happens when the
    /// pipeline is constructed.
    pub fn to_autocomplete_config(&self) -> AutoCompleteConfig {
        let sources = self.sources.clone();
        let mut config = match self.preset {
            PresetName::Strict => AutoCompleteConfig::strict(sources, self.size),
            PresetName::Fuzzy => AutoCompleteConfig::fuzzy(sources, self.size),
        };
        config.use_store = self.use_store;
        config
    }

    /// HTTP fetcher honouring the timeout and size limit.
    #[cfg(feature = "http")]
    pub fn http_fetcher(&self) -> crate::fetch::HttpFetcher {
        crate::fetch::HttpFetcher::new(self.timeout(), self.max_document_bytes)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}
