//! Retrieval orchestration.
//!
//! [`Retrieval`] wires the partition engine, the merge stage and the output
//! writer into a single run:
//!
//! ```text
//! PartitionEngine ──frontier──► merge (dedup) ──features──► write_collection
//!        │ fetch                      │ re-fetch (cache hits)
//!        ▼                            ▼
//!   FeatureSource: WfsQuery → FunctionCache → RetryPolicy → HttpClient
//! ```
//!
//! The frontier only holds regions; features are fetched a second time
//! during the merge, which the disk cache turns into local reads.
//!
//! # Example
//!
//! ```ignore
//! use whiffy::app::{Retrieval, RetrievalConfig};
//! use whiffy::engine::FeatureLimit;
//! use whiffy::query::WfsQuery;
//!
//! let query = WfsQuery::new("https://example.com/geoserver/wfs", "WCORP-001");
//! let retrieval = Retrieval::wfs(query, &RetrievalConfig::default())?;
//! let summary = retrieval.run(bounds, FeatureLimit::new(10_000), std::io::stdout().lock())?;
//! ```

mod config;

pub use config::RetrievalConfig;

use std::io::Write;

use tracing::{info, warn};

use crate::cache::FunctionCache;
use crate::coord::BoundingBox;
use crate::engine::{
    AcceptedFrontier, CancelFlag, FeatureLimit, PartitionEngine, RetrievalStats,
};
use crate::error::{WhiffyError, WhiffyResult};
use crate::merge::{merge, MergeConfig, MergeStats};
use crate::output::write_collection;
use crate::provider::ReqwestClient;
use crate::query::WfsQuery;
use crate::source::{FeatureSource, WfsSource};

/// Outcome of a complete run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalSummary {
    pub frontier: RetrievalStats,
    pub merge: MergeStats,
    /// Features written to the output.
    pub written: usize,
}

impl RetrievalSummary {
    /// Returns `true` if some regions hit the depth cap and may be truncated.
    pub fn is_partial(&self) -> bool {
        self.frontier.depth_limited > 0
    }
}

/// A configured retrieval over one feature source.
pub struct Retrieval<S> {
    engine: PartitionEngine<S>,
    merge: MergeConfig,
    cancel: CancelFlag,
}

impl Retrieval<WfsSource<ReqwestClient>> {
    /// Creates a retrieval against a WFS server over HTTP.
    ///
    /// Creates the cache directory if needed.
    pub fn wfs(query: WfsQuery, config: &RetrievalConfig) -> WhiffyResult<Self> {
        config.cache.ensure_directory()?;
        let client = ReqwestClient::new(&config.http)
            .map_err(|e| WhiffyError::Config(format!("failed to create HTTP client: {}", e)))?;

        let source = WfsSource::new(query, FunctionCache::new(config.cache.clone()), client)
            .with_retry(config.retry.clone());
        Self::new(source, config)
    }
}

impl<S: FeatureSource> Retrieval<S> {
    pub fn new(source: S, config: &RetrievalConfig) -> WhiffyResult<Self> {
        Ok(Self {
            engine: PartitionEngine::new(source, config.engine)?,
            merge: config.merge.clone(),
            cancel: CancelFlag::new(),
        })
    }

    /// Use an externally controlled cancellation flag.
    ///
    /// The flag is checked between partition levels and between merged
    /// regions.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.engine = self.engine.with_cancel_flag(cancel.clone());
        self.cancel = cancel;
        self
    }

    pub fn source(&self) -> &S {
        self.engine.source()
    }

    /// Runs the partition engine only.
    pub fn frontier(
        &self,
        bounds: BoundingBox,
        limit: FeatureLimit,
    ) -> WhiffyResult<AcceptedFrontier> {
        info!(bounds = %bounds, limit = limit.limit(), "Partitioning query bounds");
        let frontier = self.engine.retrieve(bounds, |set| limit.accepts(set))?;

        if frontier.is_partial() {
            warn!(
                regions = frontier.stats().depth_limited,
                "Some regions reached the depth cap; results may be incomplete"
            );
        }
        Ok(frontier)
    }

    /// Partitions, merges and writes the collection to `out`.
    pub fn run<W: Write>(
        &self,
        bounds: BoundingBox,
        limit: FeatureLimit,
        out: W,
    ) -> WhiffyResult<RetrievalSummary> {
        let frontier = self.frontier(bounds, limit)?;
        self.write_frontier(&frontier, &bounds, out)
    }

    /// Merges the features of an existing frontier and writes them to `out`.
    pub fn write_frontier<W: Write>(
        &self,
        frontier: &AcceptedFrontier,
        bounds: &BoundingBox,
        out: W,
    ) -> WhiffyResult<RetrievalSummary> {
        info!(regions = frontier.len(), "Merging accepted regions");

        let source = self.engine.source();
        let levels = frontier.stats().levels;
        let sets = frontier.regions().map(|region| {
            if self.cancel.is_cancelled() {
                return Err(WhiffyError::Cancelled { levels });
            }
            source.fetch(region)
        });

        let mut merged = merge(sets, bounds, &self.merge)?;
        let (header, features) = merged.parts_mut();
        let written = write_collection(out, header, features)?;
        let stats = merged.stats();

        info!(
            features = written,
            duplicates = stats.duplicates,
            tiles = stats.tiles,
            "Wrote feature collection"
        );

        Ok(RetrievalSummary {
            frontier: frontier.stats().clone(),
            merge: stats,
            written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{LatLng, Region};
    use crate::feature::FeatureSet;
    use serde_json::{json, Value};

    /// Root holds ids 0..12; each quadrant holds the ids of its 3 slots plus
    /// id 0, which lies on the shared corner.
    struct GridSource;

    impl FeatureSource for GridSource {
        fn fetch(&self, region: &Region) -> WhiffyResult<FeatureSet> {
            let ids: Vec<u64> = if region.depth == 0 {
                (0..12).collect()
            } else {
                let sw = region.bbox.sw;
                let quadrant = (sw.lat >= 0.0) as u64 * 2 + (sw.lng >= 0.0) as u64;
                let mut ids: Vec<u64> = (0..3).map(|i| 100 + quadrant * 3 + i).collect();
                ids.push(0);
                ids
            };
            let features: Vec<Value> = ids
                .iter()
                .map(|id| json!({"type": "Feature", "geometry": null, "properties": {"gid": id}}))
                .collect();
            Ok(serde_json::from_value(json!({
                "type": "FeatureCollection",
                "totalFeatures": ids.len(),
                "features": features
            }))
            .unwrap())
        }
    }

    fn bounds() -> BoundingBox {
        BoundingBox::new(LatLng::new(10.0, 10.0), LatLng::new(-10.0, -10.0)).unwrap()
    }

    fn retrieval() -> Retrieval<GridSource> {
        let mut config = RetrievalConfig::default();
        config.engine.parallelism = 1;
        Retrieval::new(GridSource, &config).unwrap()
    }

    #[test]
    fn test_run_writes_unique_features() {
        let mut out = Vec::new();

        let summary = retrieval().run(bounds(), FeatureLimit::new(10), &mut out).unwrap();

        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["features"].as_array().unwrap().len(), 13);
        assert_eq!(value["bbox"], json!([-10.0, -10.0, 10.0, 10.0]));
        assert!(value.get("totalFeatures").is_none());
        assert_eq!(summary.written, 13);
        assert_eq!(summary.merge.duplicates, 3);
        assert_eq!(summary.frontier.regions_fetched, 5);
        assert!(!summary.is_partial());
    }

    #[test]
    fn test_frontier_only() {
        let frontier = retrieval().frontier(bounds(), FeatureLimit::new(10)).unwrap();
        assert_eq!(frontier.len(), 4);
    }

    #[test]
    fn test_cancel_before_run() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let retrieval = retrieval().with_cancel_flag(cancel);

        let result = retrieval.run(bounds(), FeatureLimit::new(10), Vec::new());

        assert!(matches!(result, Err(WhiffyError::Cancelled { .. })));
    }

    #[test]
    fn test_cancel_during_merge() {
        let cancel = CancelFlag::new();
        let retrieval = retrieval().with_cancel_flag(cancel.clone());
        let frontier = retrieval.frontier(bounds(), FeatureLimit::new(10)).unwrap();

        cancel.cancel();
        let result = retrieval.write_frontier(&frontier, &bounds(), Vec::new());

        assert!(matches!(result, Err(WhiffyError::Cancelled { levels: 2 })));
    }
}
