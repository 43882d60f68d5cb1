//! Crate-level error type.
//!
//! Component errors convert into [`WhiffyError`] so retrieval code can use
//! `?` across module boundaries. Every variant is fatal for the run.

use std::io;

use serde_json::Value;
use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigFileError;
use crate::coord::{CoordError, Region};
use crate::feature::DecodeError;
use crate::provider::TransportError;

/// Result type for retrieval operations.
pub type WhiffyResult<T> = Result<T, WhiffyError>;

/// Errors that abort a retrieval run.
#[derive(Debug, Error)]
pub enum WhiffyError {
    /// Invalid query bounds.
    #[error("{0}")]
    Coord(#[from] CoordError),

    /// Fetch failed and retries were exhausted (or the failure is permanent).
    #[error("Fetch failed after {attempts} attempt(s): {source}")]
    Transport {
        #[source]
        source: TransportError,
        attempts: u32,
    },

    /// Server response could not be decoded.
    #[error("Invalid response for {}: {source}", .region.bbox)]
    Decode {
        region: Region,
        #[source]
        source: DecodeError,
    },

    /// Decode failure outside a specific region (e.g. identifier lookup).
    #[error(transparent)]
    Feature(#[from] DecodeError),

    /// Cache lookup or persistence failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Two tiles disagree on a collection-level attribute.
    #[error("Tiles disagree on attribute '{key}': {expected} vs {found}")]
    MetadataConflict {
        key: String,
        expected: Value,
        found: Value,
    },

    /// The run was cancelled between levels.
    #[error("Retrieval cancelled after {levels} level(s)")]
    Cancelled { levels: u32 },

    /// Failed to write output.
    #[error("Output error: {0}")]
    Io(#[from] io::Error),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<TransportError> for WhiffyError {
    fn from(source: TransportError) -> Self {
        WhiffyError::Transport {
            source,
            attempts: 1,
        }
    }
}

impl From<ConfigFileError> for WhiffyError {
    fn from(e: ConfigFileError) -> Self {
        WhiffyError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transport_error_reports_attempts() {
        let err = WhiffyError::Transport {
            source: TransportError::Status {
                url: "http://example.com/wfs".to_string(),
                status: 503,
            },
            attempts: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("4 attempt"));
        assert!(msg.contains("503"));
    }

    #[test]
    fn test_metadata_conflict_display() {
        let err = WhiffyError::MetadataConflict {
            key: "crs".to_string(),
            expected: json!("EPSG:4283"),
            found: json!("EPSG:4326"),
        };
        assert!(err.to_string().contains("'crs'"));
        assert!(err.to_string().contains("EPSG:4326"));
    }

    #[test]
    fn test_from_cache_error() {
        let err: WhiffyError = CacheError::Encode("bad".to_string()).into();
        assert!(matches!(err, WhiffyError::Cache(_)));
    }
}
