//! Persistent memoization of expensive, idempotent operations.
//!
//! [`FunctionCache::call`] looks up `(operation, args, kwargs)` in a cache
//! directory and only runs the injected operation on a miss. Each entry is a
//! single file named `<operation>.<digest>` holding the arguments it was
//! produced for together with the result bytes.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::traits::{ArgEncoding, BincodeEncoding, CacheError, KeyDigest, Sha256Digest};

/// Suffix of in-progress entry files.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Characters escaped in operation names used as file-name prefixes.
const NAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

/// Location of the on-disk cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Directory holding entry files. Assumed to exist.
    pub directory: PathBuf,
}

impl CacheConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Creates the cache directory if it does not exist yet.
    pub fn ensure_directory(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.directory).map_err(|source| CacheError::Io {
            path: self.directory.clone(),
            source,
        })
    }
}

/// A persisted `(args, kwargs, result)` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<A, K> {
    pub args: A,
    pub kwargs: K,
    pub result: Vec<u8>,
}

#[derive(Serialize)]
struct CacheEntryRef<'a, A, K> {
    args: &'a A,
    kwargs: &'a K,
    result: &'a [u8],
}

/// Hit and miss counters for one cache instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
}

/// Memoizing wrapper around arbitrary byte-producing operations.
///
/// # Type Parameters
///
/// * `E` - Argument serialization strategy
/// * `D` - Digest strategy for the file-name key
///
/// Concurrent callers are safe: entries are written to a unique temporary
/// file and renamed into place, so readers never observe a partial entry.
#[derive(Debug)]
pub struct FunctionCache<E = BincodeEncoding, D = Sha256Digest> {
    config: CacheConfig,
    encoding: E,
    digest: D,
    temp_seq: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl FunctionCache {
    /// Creates a cache with bincode encoding and SHA-256 keys.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_strategies(config, BincodeEncoding, Sha256Digest)
    }
}

impl<E: ArgEncoding, D: KeyDigest> FunctionCache<E, D> {
    /// Creates a cache with custom encoding and digest strategies.
    pub fn with_strategies(config: CacheConfig, encoding: E, digest: D) -> Self {
        Self {
            config,
            encoding,
            digest,
            temp_seq: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Snapshot of the hit and miss counters.
    pub fn counters(&self) -> CacheCounters {
        CacheCounters {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Path of the entry file for the given call.
    pub fn entry_path<A, K>(
        &self,
        operation: &str,
        args: &A,
        kwargs: &K,
    ) -> Result<PathBuf, CacheError>
    where
        A: Serialize,
        K: Serialize,
    {
        let args_bytes = self.encoding.encode(args)?;
        let kwargs_bytes = self.encoding.encode(kwargs)?;
        let digest = self.digest.digest(&[args_bytes.as_slice(), kwargs_bytes.as_slice()]);
        let name = format!(
            "{}.{}",
            utf8_percent_encode(operation, NAME_ENCODE_SET),
            digest
        );
        Ok(self.config.directory.join(name))
    }

    /// Returns the cached result for this call, running `op` on a miss.
    ///
    /// # Errors
    ///
    /// - [`CacheError::Consistency`] if the stored entry was produced for
    ///   different arguments
    /// - [`CacheError::Io`] / [`CacheError::Encode`] if a fresh result cannot
    ///   be persisted
    /// - Any error returned by `op`, unchanged; failed results are not cached
    pub fn call<A, K, F, Err>(
        &self,
        operation: &str,
        args: &A,
        kwargs: &K,
        op: F,
    ) -> Result<Vec<u8>, Err>
    where
        A: Serialize + DeserializeOwned + PartialEq,
        K: Serialize + DeserializeOwned + PartialEq,
        F: FnOnce(&A, &K) -> Result<Vec<u8>, Err>,
        Err: From<CacheError>,
    {
        let path = self.entry_path(operation, args, kwargs)?;

        if let Some(entry) = self.read_entry::<A, K>(&path) {
            if entry.args != *args || entry.kwargs != *kwargs {
                return Err(CacheError::Consistency {
                    operation: operation.to_string(),
                    path,
                }
                .into());
            }
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(path = %path.display(), bytes = entry.result.len(), "Cache hit");
            return Ok(entry.result);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let result = op(args, kwargs)?;
        self.write_entry(&path, args, kwargs, &result)?;
        debug!(path = %path.display(), bytes = result.len(), "Cached result");

        Ok(result)
    }

    /// Reads an entry, treating absent or unreadable files as a miss.
    fn read_entry<A, K>(&self, path: &Path) -> Option<CacheEntry<A, K>>
    where
        A: DeserializeOwned,
        K: DeserializeOwned,
    {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable cache entry, refetching");
                return None;
            }
        };

        match self.encoding.decode(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Undecodable cache entry, refetching");
                None
            }
        }
    }

    fn write_entry<A, K>(
        &self,
        path: &Path,
        args: &A,
        kwargs: &K,
        result: &[u8],
    ) -> Result<(), CacheError>
    where
        A: Serialize,
        K: Serialize,
    {
        let bytes = self.encoding.encode(&CacheEntryRef {
            args,
            kwargs,
            result,
        })?;

        let temp_path = self.temp_path(path);
        let io_err = |source: io::Error| CacheError::Io {
            path: temp_path.clone(),
            source,
        };

        let file = File::create(&temp_path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&bytes).map_err(io_err)?;
        writer.flush().map_err(io_err)?;
        drop(writer);

        // Atomic rename
        fs::rename(&temp_path, path).map_err(|source| {
            let _ = fs::remove_file(&temp_path);
            CacheError::Io {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Unique temporary path next to the final entry.
    fn temp_path(&self, path: &Path) -> PathBuf {
        let seq = self.temp_seq.fetch_add(1, Ordering::Relaxed);
        let mut name = path.as_os_str().to_owned();
        name.push(format!(".{}-{}{}", std::process::id(), seq, TEMP_SUFFIX));
        PathBuf::from(name)
    }
}
