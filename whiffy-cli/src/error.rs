//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use whiffy::WhiffyError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Invalid command-line argument
    InvalidArgument(String),
    /// Retrieval failed
    Retrieval(WhiffyError),
    /// Cache maintenance failed
    Cache { path: PathBuf, error: std::io::Error },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Retrieval(WhiffyError::Transport { .. }) => {
                eprintln!();
                eprintln!("Common issues:");
                eprintln!("  1. Server URL should be the WFS endpoint, without query parameters");
                eprintln!("  2. Slow servers may need a longer [http] timeout in config.ini");
                eprintln!("  3. Some servers reject requests without an identifying --header");
            }
            CliError::Retrieval(WhiffyError::Cancelled { .. }) => {
                eprintln!();
                eprintln!("Fetched regions are cached; re-run the same command to resume.");
            }
            CliError::Retrieval(WhiffyError::Cache(_)) => {
                eprintln!();
                eprintln!("The cache may be corrupt. Run 'whiffy cache clear' and try again.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Retrieval(e) => write!(f, "{}", e),
            CliError::Cache { path, error } => {
                write!(f, "Cache operation failed at '{}': {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Retrieval(e) => Some(e),
            CliError::Cache { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<WhiffyError> for CliError {
    fn from(e: WhiffyError) -> Self {
        CliError::Retrieval(e)
    }
}

impl From<whiffy::config::ConfigFileError> for CliError {
    fn from(e: whiffy::config::ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}
