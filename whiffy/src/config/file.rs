//! Configuration file handling for ~/.whiffy/config.ini.
//!
//! Loads user configuration with sensible defaults. Parsing lives in
//! [`super::parser`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::engine::{EngineConfig, DEFAULT_MAX_DEPTH, DEFAULT_PARALLELISM};
use crate::feature::IdentifierField;
use crate::provider::{HttpConfig, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::retry::{RetryPolicy, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS};

/// Name of the directory under `$HOME` holding the config file.
pub const CONFIG_DIR_NAME: &str = ".whiffy";

/// Name of the config file.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub directory: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: default_cache_directory(),
        }
    }
}

/// `[http]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpSettings {
    /// Request timeout in seconds.
    pub timeout: u64,
    pub user_agent: String,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Initial backoff delay in milliseconds.
    pub retry_base_delay_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_retries: DEFAULT_MAX_ATTEMPTS - 1,
            retry_base_delay_ms: DEFAULT_INITIAL_DELAY_MS,
        }
    }
}

/// `[retrieval]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalSettings {
    /// `None` disables the depth cap.
    pub max_depth: Option<u32>,
    pub parallelism: usize,
    pub id_field: IdentifierField,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            max_depth: Some(DEFAULT_MAX_DEPTH),
            parallelism: DEFAULT_PARALLELISM,
            id_field: IdentifierField::default(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoggingSettings {
    /// Optional log file in addition to stderr.
    pub file: Option<PathBuf>,
}

/// User configuration for a retrieval run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub http: HttpSettings,
    pub retrieval: RetrievalSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load configuration from the default path (~/.whiffy/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Transport settings derived from the `[http]` section.
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            timeout: Duration::from_secs(self.http.timeout),
            user_agent: self.http.user_agent.clone(),
            headers: Vec::new(),
        }
    }

    /// Retry policy derived from the `[http]` section.
    pub fn retry_policy(&self) -> RetryPolicy {
        if self.http.max_retries == 0 {
            return RetryPolicy::None;
        }
        RetryPolicy::exponential_from(
            self.http.max_retries.saturating_add(1),
            Duration::from_millis(self.http.retry_base_delay_ms),
        )
    }

    /// Engine settings derived from the `[retrieval]` section.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_depth: self.retrieval.max_depth,
            parallelism: self.retrieval.parallelism,
        }
    }
}

/// Get the path to the config directory (~/.whiffy).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Get the path to the config file (~/.whiffy/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

/// Default cache directory: the platform cache dir, or `./cache`.
pub fn default_cache_directory() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("whiffy"))
        .unwrap_or_else(|| PathBuf::from("cache"))
}
