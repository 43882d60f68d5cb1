//! Configuration for a retrieval run.

use std::path::PathBuf;

use crate::cache::CacheConfig;
use crate::config::ConfigFile;
use crate::engine::EngineConfig;
use crate::merge::MergeConfig;
use crate::provider::HttpConfig;
use crate::retry::RetryPolicy;

/// Everything needed to wire a WFS retrieval.
///
/// Usually built from a [`ConfigFile`] and then adjusted with command-line
/// overrides.
#[derive(Clone, Debug, PartialEq)]
pub struct RetrievalConfig {
    pub cache: CacheConfig,
    pub http: HttpConfig,
    pub retry: RetryPolicy,
    pub engine: EngineConfig,
    pub merge: MergeConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self::from_config_file(&ConfigFile::default())
    }
}

impl RetrievalConfig {
    /// Derives run settings from a loaded config file.
    pub fn from_config_file(config: &ConfigFile) -> Self {
        Self {
            cache: CacheConfig::new(config.cache.directory.clone()),
            http: config.http_config(),
            retry: config.retry_policy(),
            engine: config.engine_config(),
            merge: MergeConfig::default().with_id_field(config.retrieval.id_field.clone()),
        }
    }

    pub fn with_cache_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.cache = CacheConfig::new(directory);
        self
    }
}
