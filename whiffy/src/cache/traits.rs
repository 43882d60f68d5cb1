//! Strategy traits for the memoizing function cache.
//!
//! A cache key is derived in two steps: the call's arguments are serialized
//! with an [`ArgEncoding`], then the bytes are hashed with a [`KeyDigest`].
//! The same encoding is used to persist [`CacheEntry`](super::CacheEntry)
//! files, so a stored entry can be decoded and compared against the call.
//!
//! # Design Principles
//!
//! - **Exact arguments**: entries store the arguments they were produced for
//! - **Raw bytes**: results are opaque bytes, decoded by the caller
//! - **Pluggable**: encoding and digest are injected, with bincode and
//!   SHA-256 as defaults

use std::io;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A stored entry was produced for different arguments than the call.
    ///
    /// Indicates a digest collision or serialization drift. Never treated as
    /// a miss.
    #[error("Cache entry {} for '{operation}' was stored for different arguments", .path.display())]
    Consistency { operation: String, path: PathBuf },

    /// I/O error while persisting an entry.
    #[error("Cache I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Arguments or entry could not be serialized.
    #[error("Cache encoding error: {0}")]
    Encode(String),
}

/// Serialization strategy for arguments and persisted entries.
pub trait ArgEncoding: Send + Sync {
    /// Serializes a value to canonical bytes.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CacheError>;

    /// Deserializes a value previously produced by [`encode`](Self::encode).
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError>;
}

/// Digest strategy producing the file-name component of a cache key.
pub trait KeyDigest: Send + Sync {
    /// Hashes the given byte slices, in order, into a filename-safe string.
    fn digest(&self, parts: &[&[u8]]) -> String;
}

/// Canonical binary encoding via bincode.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeEncoding;

impl ArgEncoding for BincodeEncoding {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CacheError> {
        bincode::serialize(value).map_err(|e| CacheError::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError> {
        bincode::deserialize(bytes).map_err(|e| CacheError::Encode(e.to_string()))
    }
}

/// Lowercase hexadecimal SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digest;

impl KeyDigest for Sha256Digest {
    fn digest(&self, parts: &[&[u8]]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        format!("{:x}", hasher.finalize())
    }
}
