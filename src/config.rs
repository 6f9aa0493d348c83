//! Indexing configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// Configuration for the indexing core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    /// Base directory holding the physical index slots
    pub index_path: PathBuf,

    /// Directory for the durable change-stamp store
    pub stamp_path: PathBuf,

    /// Index writer heap size in bytes (default: 50MB)
    pub writer_heap_size: usize,

    /// Page size used when enumerating descendants during a cascade
    pub descendant_page_size: usize,

    /// Maximum search results that can be fetched in one request
    pub max_results: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("./data/indexes"),
            stamp_path: PathBuf::from("./data/stamps"),
            writer_heap_size: 50_000_000, // 50MB
            descendant_page_size: 500,
            max_results: 1000,
        }
    }
}

impl IndexingConfig {
    /// Load configuration from `canopy.toml` (if present) and `CANOPY_*`
    /// environment variable overrides.
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("canopy").required(false))
            .add_source(config::Environment::with_prefix("CANOPY"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// Builder for IndexingConfig
pub struct IndexingConfigBuilder {
    config: IndexingConfig,
}

impl IndexingConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: IndexingConfig::default(),
        }
    }

    pub fn index_path(mut self, path: PathBuf) -> Self {
        self.config.index_path = path;
        self
    }

    pub fn stamp_path(mut self, path: PathBuf) -> Self {
        self.config.stamp_path = path;
        self
    }

    pub fn writer_heap_size(mut self, size: usize) -> Self {
        self.config.writer_heap_size = size;
        self
    }

    pub fn descendant_page_size(mut self, size: usize) -> Self {
        self.config.descendant_page_size = size;
        self
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.config.max_results = max;
        self
    }

    pub fn build(self) -> IndexingConfig {
        self.config
    }
}

impl Default for IndexingConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = IndexingConfigBuilder::new()
            .descendant_page_size(50)
            .max_results(100)
            .build();

        assert_eq!(config.descendant_page_size, 50);
        assert_eq!(config.max_results, 100);
        assert_eq!(config.writer_heap_size, 50_000_000);
    }
}
