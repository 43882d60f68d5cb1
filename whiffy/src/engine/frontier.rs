//! Result of a partition run.

use serde::Serialize;

use crate::coord::Region;

/// Why a region ended up in the frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Acceptance {
    /// The predicate accepted the region's result.
    Accepted,
    /// The predicate rejected it but the depth cap stopped further splits.
    /// The region's features may be truncated by the server.
    DepthLimited,
}

/// One entry of the accepted frontier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrontierEntry {
    pub region: Region,
    pub acceptance: Acceptance,
    /// Number of features the region returned when it was evaluated.
    pub features: usize,
}

/// Counters describing one partition run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetrievalStats {
    /// Regions fetched, including rejected ones.
    pub regions_fetched: usize,
    /// Levels processed.
    pub levels: u32,
    /// Regions that were split into quadrants.
    pub splits: usize,
    /// Frontier entries marked [`Acceptance::DepthLimited`].
    pub depth_limited: usize,
    /// Deepest level processed.
    pub max_depth: u32,
}

/// The accepted regions of a run, in traversal order.
///
/// Order is breadth first and, within a level, follows the quadrant order
/// of the parents. It is identical across runs for identical responses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcceptedFrontier {
    entries: Vec<FrontierEntry>,
    stats: RetrievalStats,
}

impl AcceptedFrontier {
    pub(crate) fn new(entries: Vec<FrontierEntry>, stats: RetrievalStats) -> Self {
        Self { entries, stats }
    }

    pub fn entries(&self) -> &[FrontierEntry] {
        &self.entries
    }

    /// Regions in traversal order.
    pub fn regions(&self) -> impl Iterator<Item = &Region> + '_ {
        self.entries.iter().map(|e| &e.region)
    }

    pub fn stats(&self) -> &RetrievalStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if any region hit the depth cap.
    pub fn is_partial(&self) -> bool {
        self.stats.depth_limited > 0
    }

    pub fn into_entries(self) -> Vec<FrontierEntry> {
        self.entries
    }
}
