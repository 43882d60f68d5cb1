//! User configuration.
//!
//! Settings are read from an INI file (default `~/.whiffy/config.ini`) and
//! converted into the explicit config structs used by the library:
//! [`HttpConfig`](crate::provider::HttpConfig),
//! [`RetryPolicy`](crate::retry::RetryPolicy) and
//! [`EngineConfig`](crate::engine::EngineConfig).
//!
//! ```ini
//! [cache]
//! directory = ~/.cache/whiffy
//!
//! [http]
//! timeout = 60
//! max_retries = 3
//!
//! [retrieval]
//! max_depth = 16
//! parallelism = 4
//! id_field = gid
//! ```

mod file;
mod parser;

pub use file::{
    config_directory, config_file_path, default_cache_directory, CacheSettings, ConfigFile,
    ConfigFileError, HttpSettings, LoggingSettings, RetrievalSettings, CONFIG_DIR_NAME,
    CONFIG_FILE_NAME,
};
pub use parser::{parse_id_field, FEATURE_ID_KEYWORD};
