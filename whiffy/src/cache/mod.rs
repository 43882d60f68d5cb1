//! Disk-backed memoization of remote fetches.
//!
//! [`FunctionCache`] persists the result of every distinct call so that
//! repeated runs over the same area reuse earlier fetches. Entries are never
//! expired; use [`clear`] to remove them.
//!
//! # Example
//!
//! ```ignore
//! use whiffy::cache::{CacheConfig, FunctionCache};
//!
//! let cache = FunctionCache::new(CacheConfig::new("./cache"));
//! // `fetch` returns Result<Vec<u8>, WhiffyError>; only misses call it
//! let bytes = cache.call("get_json_data", &bbox, &identity, |bbox, _| fetch(bbox))?;
//! ```

mod function;
mod maintenance;
mod traits;

pub use function::{CacheConfig, CacheCounters, CacheEntry, FunctionCache, TEMP_SUFFIX};
pub use maintenance::{clear, disk_stats, CacheStats};
pub use traits::{ArgEncoding, BincodeEncoding, CacheError, KeyDigest, Sha256Digest};
