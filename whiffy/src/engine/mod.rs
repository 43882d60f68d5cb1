//! Adaptive spatial partitioning.
//!
//! The [`PartitionEngine`] finds a set of regions that together cover the
//! query bounds and whose individual results each satisfy an acceptance
//! predicate. A region whose result is rejected (typically because the
//! server truncated it at its per-request cap) is split into four quadrants
//! and the quadrants are fetched on the next level.
//!
//! # Architecture
//!
//! ```text
//! level 0:  [root]
//!              │ rejected → quad_split
//! level 1:  [SW] [SE] [NW] [NE]
//!                      │ rejected → quad_split
//! level 2:            [SW] [SE] [NW] [NE]
//! ```
//!
//! The work queue is breadth first. All regions of a level are fetched
//! (concurrently when `parallelism > 1`), then decisions are made one by one
//! in queue order, so the resulting frontier never depends on scheduling.

mod frontier;
mod progress;

pub use frontier::{AcceptedFrontier, Acceptance, FrontierEntry, RetrievalStats};
pub use progress::{Decision, NoProgress, ProgressObserver, RegionEvent, TracingProgress};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::coord::{BoundingBox, Region};
use crate::error::{WhiffyError, WhiffyResult};
use crate::feature::FeatureSet;
use crate::source::FeatureSource;

/// Default depth at which rejected regions stop being split.
pub const DEFAULT_MAX_DEPTH: u32 = 16;

/// Default number of concurrent fetches per level.
pub const DEFAULT_PARALLELISM: usize = 4;

/// Tuning for a partition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Depth at which rejected regions are kept instead of split.
    /// `None` splits without limit.
    pub max_depth: Option<u32>,
    /// Maximum concurrent fetches within one level. 1 fetches on the
    /// calling thread.
    pub parallelism: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: Some(DEFAULT_MAX_DEPTH),
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

impl EngineConfig {
    pub fn with_max_depth(mut self, max_depth: Option<u32>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    fn at_cap(&self, depth: u32) -> bool {
        self.max_depth.is_some_and(|max| depth >= max)
    }
}

/// Shared flag requesting that a run stop at the next level boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Accepts a result only when it is strictly below the server's cap.
///
/// A response with exactly `limit` features is indistinguishable from a
/// truncated one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureLimit {
    limit: usize,
}

impl FeatureLimit {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn accepts(&self, set: &FeatureSet) -> bool {
        set.len() < self.limit
    }
}

/// Breadth-first quadtree partitioner over a [`FeatureSource`].
///
/// # Type Parameters
///
/// * `S` - Source of per-region feature sets
/// * `P` - Progress observer
pub struct PartitionEngine<S, P = TracingProgress> {
    source: S,
    config: EngineConfig,
    progress: P,
    cancel: CancelFlag,
    pool: Option<rayon::ThreadPool>,
}

impl<S: FeatureSource> PartitionEngine<S> {
    /// Creates an engine reporting progress through `tracing`.
    ///
    /// # Errors
    ///
    /// Returns [`WhiffyError::Config`] if `parallelism` is zero or the fetch
    /// pool cannot be created.
    pub fn new(source: S, config: EngineConfig) -> WhiffyResult<Self> {
        let pool = match config.parallelism {
            0 => {
                return Err(WhiffyError::Config(
                    "parallelism must be at least 1".to_string(),
                ))
            }
            1 => None,
            n => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("whiffy-fetch-{}", i))
                    .build()
                    .map_err(|e| {
                        WhiffyError::Config(format!("failed to start fetch pool: {}", e))
                    })?,
            ),
        };

        Ok(Self {
            source,
            config,
            progress: TracingProgress,
            cancel: CancelFlag::new(),
            pool,
        })
    }
}

impl<S: FeatureSource, P: ProgressObserver> PartitionEngine<S, P> {
    /// Replace the progress observer.
    pub fn with_progress<Q: ProgressObserver>(self, progress: Q) -> PartitionEngine<S, Q> {
        PartitionEngine {
            source: self.source,
            config: self.config,
            progress,
            cancel: self.cancel,
            pool: self.pool,
        }
    }

    /// Use an externally controlled cancellation flag.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn progress(&self) -> &P {
        &self.progress
    }

    /// Computes the accepted frontier for `bounds`.
    ///
    /// # Errors
    ///
    /// Any fetch or decode failure aborts the run, as does cancellation.
    /// Reaching the depth cap is not an error; affected regions are marked
    /// [`Acceptance::DepthLimited`].
    pub fn retrieve<A>(&self, bounds: BoundingBox, accept: A) -> WhiffyResult<AcceptedFrontier>
    where
        A: Fn(&FeatureSet) -> bool + Sync,
    {
        let mut queue = vec![Region::root(bounds)];
        let mut entries = Vec::new();
        let mut stats = RetrievalStats::default();

        while let Some(first) = queue.first() {
            if self.cancel.is_cancelled() {
                warn!(levels = stats.levels, "Retrieval cancelled");
                return Err(WhiffyError::Cancelled {
                    levels: stats.levels,
                });
            }

            let depth = first.depth;
            let level_size = queue.len();
            self.progress.level_started(depth, level_size);

            let outcomes = self.evaluate_level(&queue, &accept)?;
            let mut next = Vec::new();

            for (index, (region, (features, accepted))) in queue.iter().zip(outcomes).enumerate() {
                let decision = if accepted {
                    Decision::Accepted
                } else if self.config.at_cap(region.depth) {
                    Decision::DepthLimited
                } else {
                    Decision::Split
                };

                match decision {
                    Decision::Accepted => entries.push(FrontierEntry {
                        region: *region,
                        acceptance: Acceptance::Accepted,
                        features,
                    }),
                    Decision::DepthLimited => {
                        stats.depth_limited += 1;
                        entries.push(FrontierEntry {
                            region: *region,
                            acceptance: Acceptance::DepthLimited,
                            features,
                        });
                    }
                    Decision::Split => {
                        stats.splits += 1;
                        next.extend(region.children());
                    }
                }

                self.progress.region_fetched(&RegionEvent {
                    index,
                    level_size,
                    region: *region,
                    features,
                    decision,
                });
            }

            stats.regions_fetched += level_size;
            stats.levels += 1;
            stats.max_depth = depth;
            debug!(depth, accepted = entries.len(), next = next.len(), "Level complete");
            queue = next;
        }

        self.progress.finished(&stats);
        Ok(AcceptedFrontier::new(entries, stats))
    }

    /// Fetches every region of a level and applies the predicate.
    ///
    /// Returns `(feature count, accepted)` per region, in queue order. Feature
    /// sets are dropped as soon as they are evaluated.
    fn evaluate_level<A>(&self, level: &[Region], accept: &A) -> WhiffyResult<Vec<(usize, bool)>>
    where
        A: Fn(&FeatureSet) -> bool + Sync,
    {
        let evaluate = |region: &Region| {
            self.source
                .fetch(region)
                .map(|set| (set.len(), accept(&set)))
        };

        match &self.pool {
            Some(pool) => pool.install(|| level.par_iter().map(evaluate).collect()),
            None => level.iter().map(evaluate).collect(),
        }
    }
}

#[cfg(test)]
mod tests;
