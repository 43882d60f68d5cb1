//! Progress reporting for partition runs.

use tracing::{debug, info, warn};

use super::frontier::RetrievalStats;
use crate::coord::Region;

/// Outcome of evaluating one fetched region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The region satisfied the predicate.
    Accepted,
    /// The region was rejected and split into quadrants.
    Split,
    /// The region was rejected at the depth cap and kept as-is.
    DepthLimited,
}

/// Details of one fetched region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionEvent {
    /// Position within the current level (0-based).
    pub index: usize,
    /// Number of regions in the current level.
    pub level_size: usize,
    pub region: Region,
    /// Number of features the server returned.
    pub features: usize,
    pub decision: Decision,
}

/// Observer notified as the engine walks the partition tree.
///
/// All methods default to doing nothing. Observers never influence the
/// traversal.
pub trait ProgressObserver: Send + Sync {
    /// Called before a level's regions are fetched.
    fn level_started(&self, _depth: u32, _queued: usize) {}

    /// Called for every region after its decision is made, in queue order.
    fn region_fetched(&self, _event: &RegionEvent) {}

    /// Called once the frontier is complete.
    fn finished(&self, _stats: &RetrievalStats) {}
}

/// Logs progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressObserver for TracingProgress {
    fn level_started(&self, depth: u32, queued: usize) {
        info!(depth, regions = queued, "Fetching level");
    }

    fn region_fetched(&self, event: &RegionEvent) {
        match event.decision {
            Decision::DepthLimited => warn!(
                depth = event.region.depth,
                features = event.features,
                bbox = %event.region.bbox,
                "Depth cap reached, keeping region unsplit"
            ),
            decision => debug!(
                index = event.index + 1,
                of = event.level_size,
                depth = event.region.depth,
                features = event.features,
                ?decision,
                bbox = %event.region.bbox,
                "Region fetched"
            ),
        }
    }

    fn finished(&self, stats: &RetrievalStats) {
        info!(
            regions = stats.regions_fetched,
            levels = stats.levels,
            splits = stats.splits,
            depth_limited = stats.depth_limited,
            max_depth = stats.max_depth,
            "Partition complete"
        );
    }
}

/// Discards all progress events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}
