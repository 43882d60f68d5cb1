//! Feature sources: where a region's features come from.
//!
//! [`FeatureSource`] is the seam between the partition engine and the remote
//! service. [`WfsSource`] is the production implementation, combining query
//! construction, the disk cache, the HTTP transport and retries.

use tracing::error;

use crate::cache::{CacheCounters, FunctionCache};
use crate::coord::Region;
use crate::error::{WhiffyError, WhiffyResult};
use crate::feature::{validate_json, FeatureSet};
use crate::provider::{HttpClient, TransportError};
use crate::query::{QueryIdentity, WfsQuery};
use crate::retry::RetryPolicy;

/// Cache operation name for raw feature responses.
pub const FETCH_OPERATION: &str = "get_json_data";

/// Maximum number of response bytes echoed in diagnostics.
const BODY_PREVIEW_LEN: usize = 256;

/// Trait for anything that can produce the features of a region.
///
/// Implementations must be deterministic for a given region within a run;
/// the partition engine and merge stage may fetch the same region twice.
pub trait FeatureSource: Send + Sync {
    /// Fetches and decodes the features for one region.
    fn fetch(&self, region: &Region) -> WhiffyResult<FeatureSet>;
}

impl<S: FeatureSource + ?Sized> FeatureSource for &S {
    fn fetch(&self, region: &Region) -> WhiffyResult<FeatureSet> {
        (**self).fetch(region)
    }
}

/// WFS-backed feature source with disk memoization.
///
/// Raw response bytes are cached per bounding box; decoding happens after
/// every lookup, so cached entries are always re-validated.
pub struct WfsSource<C: HttpClient> {
    query: WfsQuery,
    identity: QueryIdentity,
    cache: FunctionCache,
    client: C,
    retry: RetryPolicy,
}

impl<C: HttpClient> WfsSource<C> {
    /// Creates a source with the default retry policy.
    pub fn new(query: WfsQuery, cache: FunctionCache, client: C) -> Self {
        let identity = query.identity();
        Self {
            query,
            identity,
            cache,
            client,
            retry: RetryPolicy::default(),
        }
    }

    /// Set the retry policy applied to each region's fetch.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn query(&self) -> &WfsQuery {
        &self.query
    }

    /// Cache hit/miss counters for this source.
    pub fn cache_counters(&self) -> CacheCounters {
        self.cache.counters()
    }

    /// Returns the raw response bytes for a region, from cache if present.
    ///
    /// Responses that are not valid JSON are rejected before they reach the
    /// cache.
    pub fn fetch_bytes(&self, region: &Region) -> WhiffyResult<Vec<u8>> {
        self.cache
            .call(FETCH_OPERATION, &region.bbox, &self.identity, |bbox, _| {
                let uri = self.query.build_uri(Some(bbox));
                let body = self
                    .retry
                    .run(|| self.client.get(&uri), TransportError::is_retryable)
                    .map_err(|(source, attempts)| WhiffyError::Transport { source, attempts })?;

                validate_json(&body).map_err(|source| {
                    log_invalid_body(&uri, &body);
                    WhiffyError::Decode {
                        region: *region,
                        source,
                    }
                })?;

                Ok(body)
            })
    }
}

impl<C: HttpClient> FeatureSource for WfsSource<C> {
    fn fetch(&self, region: &Region) -> WhiffyResult<FeatureSet> {
        let bytes = self.fetch_bytes(region)?;
        FeatureSet::from_slice(&bytes).map_err(|source| WhiffyError::Decode {
            region: *region,
            source,
        })
    }
}

fn log_invalid_body(uri: &str, body: &[u8]) {
    let preview = String::from_utf8_lossy(&body[..body.len().min(BODY_PREVIEW_LEN)]);
    error!(uri = %uri, bytes = body.len(), body = %preview, "Invalid data from server");
}
