//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;

use clap::Args;
use whiffy::app::RetrievalConfig;
use whiffy::config::ConfigFile;
use whiffy::coord::{BoundingBox, LatLng};
use whiffy::engine::{CancelFlag, FeatureLimit};
use whiffy::logging::{init_logging, LoggingGuard};
use whiffy::query::WfsQuery;

use crate::error::CliError;

/// Positional query arguments and retrieval tuning shared by `get` and
/// `frontier`.
#[derive(Debug, Args)]
pub struct QueryArgs {
    /// WFS endpoint, e.g. https://example.com/geoserver/wfs
    pub server: String,

    /// Feature type name (WFS typename)
    pub typename: String,

    /// Latitude of the northeast corner
    #[arg(allow_negative_numbers = true)]
    pub ne_lat: f64,

    /// Longitude of the northeast corner
    #[arg(allow_negative_numbers = true)]
    pub ne_lng: f64,

    /// Latitude of the southwest corner
    #[arg(allow_negative_numbers = true)]
    pub sw_lat: f64,

    /// Longitude of the southwest corner
    #[arg(allow_negative_numbers = true)]
    pub sw_lng: f64,

    /// Server's maximum features per request; regions returning this many
    /// are split
    pub limit: usize,

    /// Stop splitting at this depth (0 disables the cap)
    #[arg(long, value_name = "N")]
    pub max_depth: Option<u32>,

    /// Split without a depth cap
    #[arg(long, conflicts_with = "max_depth")]
    pub unbounded: bool,

    /// Concurrent requests per level
    #[arg(long, value_name = "N")]
    pub parallelism: Option<usize>,

    /// Cache directory (overrides [cache] directory)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Config file (default: ~/.whiffy/config.ini)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Extra request header, repeatable
    #[arg(long = "header", value_name = "NAME:VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,
}

impl QueryArgs {
    pub fn bounds(&self) -> Result<BoundingBox, CliError> {
        BoundingBox::new(
            LatLng::new(self.ne_lat, self.ne_lng),
            LatLng::new(self.sw_lat, self.sw_lng),
        )
        .map_err(|e| CliError::InvalidArgument(e.to_string()))
    }

    pub fn limit(&self) -> Result<FeatureLimit, CliError> {
        if self.limit == 0 {
            return Err(CliError::InvalidArgument(
                "limit must be at least 1".to_string(),
            ));
        }
        Ok(FeatureLimit::new(self.limit))
    }

    pub fn query(&self) -> WfsQuery {
        WfsQuery::new(self.server.as_str(), self.typename.as_str())
    }

    /// Loads the config file named by `--config`, or the default one.
    pub fn load_config(&self) -> Result<ConfigFile, CliError> {
        let config = match &self.config {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };
        Ok(config)
    }

    /// Run settings from the config file with command-line overrides applied.
    pub fn retrieval_config(&self, file: &ConfigFile) -> Result<RetrievalConfig, CliError> {
        let mut config = RetrievalConfig::from_config_file(file);

        if let Some(dir) = &self.cache_dir {
            config = config.with_cache_dir(dir);
        }
        if self.unbounded {
            config.engine.max_depth = None;
        } else if let Some(depth) = self.max_depth {
            config.engine.max_depth = (depth > 0).then_some(depth);
        }
        if let Some(parallelism) = self.parallelism {
            if parallelism == 0 {
                return Err(CliError::InvalidArgument(
                    "--parallelism must be at least 1".to_string(),
                ));
            }
            config.engine.parallelism = parallelism;
        }
        config.http.headers.extend(self.headers.iter().cloned());

        Ok(config)
    }
}

/// Parses a `NAME:VALUE` header argument.
pub fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name is empty in '{}'", s));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Initializes logging to stderr plus the configured log file.
pub fn start_logging(config: &ConfigFile, verbose: bool) -> Result<LoggingGuard, CliError> {
    let level = if verbose { "debug" } else { "info" };
    init_logging(level, config.logging.file.as_deref())
        .map_err(|e| CliError::LoggingInit(e.to_string()))
}

/// Returns a flag that is set when the user presses Ctrl-C.
pub fn install_cancel_handler() -> Result<CancelFlag, CliError> {
    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("Cancelling after the current level...");
        handler_flag.cancel();
    })
    .map_err(|e| CliError::Config(format!("failed to install Ctrl-C handler: {}", e)))?;
    Ok(cancel)
}
