//! Merging per-region results into one deduplicated collection.
//!
//! Neighbouring regions share edges, so features lying on (or spanning) a
//! boundary are returned by more than one region. [`merge`] streams the
//! per-region [`FeatureSet`]s in frontier order, keeps the first occurrence
//! of every identifier and drops the rest.
//!
//! Collection-level attributes are taken from the first non-empty set. Keys
//! that describe a single response (such as `totalFeatures`) are stripped;
//! every other key must agree across tiles.

use std::collections::HashSet;

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::coord::BoundingBox;
use crate::error::{WhiffyError, WhiffyResult};
use crate::feature::{Feature, FeatureId, FeatureSet, IdentifierField};

/// Per-response keys removed before comparing tiles.
pub const DEFAULT_ENVELOPE_KEYS: &[&str] = &[
    "totalFeatures",
    "numberMatched",
    "numberReturned",
    "timeStamp",
    "features",
];

/// Attribute overridden with the query bounds.
pub const DEFAULT_EXTENT_KEY: &str = "bbox";

/// Merge options.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeConfig {
    /// Field used as the deduplication key.
    pub id_field: IdentifierField,
    /// Top-level keys ignored when comparing tiles.
    pub envelope_keys: Vec<String>,
    /// Key holding the spatial extent, reset to the query bounds.
    pub extent_key: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            id_field: IdentifierField::default(),
            envelope_keys: DEFAULT_ENVELOPE_KEYS.iter().map(|k| k.to_string()).collect(),
            extent_key: DEFAULT_EXTENT_KEY.to_string(),
        }
    }
}

impl MergeConfig {
    pub fn with_id_field(mut self, id_field: IdentifierField) -> Self {
        self.id_field = id_field;
        self
    }

    fn strip(&self, attributes: &mut Map<String, Value>) {
        for key in &self.envelope_keys {
            attributes.remove(key);
        }
        attributes.remove(&self.extent_key);
    }
}

/// Counters for a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Feature sets consumed so far.
    pub tiles: usize,
    /// Unique features emitted.
    pub emitted: usize,
    /// Repeated features dropped.
    pub duplicates: usize,
}

/// Header plus a lazy stream of unique features.
pub struct MergedCollection<I> {
    header: Map<String, Value>,
    features: MergedFeatures<I>,
}

impl<I> MergedCollection<I>
where
    I: Iterator<Item = WhiffyResult<FeatureSet>>,
{
    /// Collection-level attributes, extent included.
    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    /// The remaining unique features.
    pub fn features(&mut self) -> &mut MergedFeatures<I> {
        &mut self.features
    }

    /// Header and feature stream borrowed together, for writing.
    pub fn parts_mut(&mut self) -> (&Map<String, Value>, &mut MergedFeatures<I>) {
        (&self.header, &mut self.features)
    }

    pub fn stats(&self) -> MergeStats {
        self.features.stats
    }
}

/// Iterator over deduplicated features.
///
/// Yields at most one error, after which it is exhausted.
pub struct MergedFeatures<I> {
    sets: I,
    current: std::vec::IntoIter<Feature>,
    /// Attributes seen so far on non-empty tiles, for conflict checks.
    seen_attributes: Map<String, Value>,
    seen_ids: HashSet<FeatureId>,
    config: MergeConfig,
    stats: MergeStats,
    done: bool,
}

impl<I> MergedFeatures<I>
where
    I: Iterator<Item = WhiffyResult<FeatureSet>>,
{
    pub fn stats(&self) -> MergeStats {
        self.stats
    }

    /// Registers a tile, returning its features.
    fn absorb(&mut self, mut set: FeatureSet) -> WhiffyResult<Vec<Feature>> {
        self.stats.tiles += 1;
        if set.is_empty() {
            return Ok(Vec::new());
        }

        self.config.strip(&mut set.attributes);
        for (key, value) in set.attributes {
            match self.seen_attributes.get(&key) {
                Some(expected) if *expected != value => {
                    return Err(WhiffyError::MetadataConflict {
                        key,
                        expected: expected.clone(),
                        found: value,
                    });
                }
                Some(_) => {}
                None => {
                    self.seen_attributes.insert(key, value);
                }
            }
        }

        Ok(set.features)
    }

    fn fail(&mut self, error: WhiffyError) -> Option<WhiffyResult<Feature>> {
        self.done = true;
        Some(Err(error))
    }
}

impl<I> Iterator for MergedFeatures<I>
where
    I: Iterator<Item = WhiffyResult<FeatureSet>>,
{
    type Item = WhiffyResult<Feature>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            if let Some(feature) = self.current.next() {
                match feature.identifier(&self.config.id_field) {
                    Ok(id) if self.seen_ids.insert(id.clone()) => {
                        self.stats.emitted += 1;
                        return Some(Ok(feature));
                    }
                    Ok(id) => {
                        debug!(id = %id, "Dropping duplicate feature");
                        self.stats.duplicates += 1;
                        continue;
                    }
                    Err(e) => return self.fail(e.into()),
                }
            }

            match self.sets.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Err(e)) => return self.fail(e),
                Some(Ok(set)) => match self.absorb(set) {
                    Ok(features) => self.current = features.into_iter(),
                    Err(e) => return self.fail(e),
                },
            }
        }
    }
}

/// Merges per-region feature sets into a single collection.
///
/// Sets are consumed lazily; only the sets up to the first non-empty one are
/// read before this returns, to build the header.
///
/// # Errors
///
/// Returns the first error yielded by `feature_sets` before the header is
/// known. Later errors, including [`WhiffyError::MetadataConflict`] and
/// identifier failures, surface through the feature stream.
pub fn merge<I>(
    feature_sets: I,
    bounds: &BoundingBox,
    config: &MergeConfig,
) -> WhiffyResult<MergedCollection<I::IntoIter>>
where
    I: IntoIterator<Item = WhiffyResult<FeatureSet>>,
{
    let mut features = MergedFeatures {
        sets: feature_sets.into_iter(),
        current: Vec::new().into_iter(),
        seen_attributes: Map::new(),
        seen_ids: HashSet::new(),
        config: config.clone(),
        stats: MergeStats::default(),
        done: false,
    };

    // Consume up to the first tile with features
    let mut first = None;
    for set in features.sets.by_ref() {
        let set = set?;
        if set.is_empty() {
            features.stats.tiles += 1;
            continue;
        }
        first = Some(set);
        break;
    }

    let mut header = match first {
        Some(set) => {
            let tile_features = features.absorb(set)?;
            features.current = tile_features.into_iter();
            features.seen_attributes.clone()
        }
        None => {
            let mut header = Map::new();
            header.insert("type".to_string(), json!("FeatureCollection"));
            header
        }
    };

    header.insert(config.extent_key.clone(), json!(bounds.to_wsen()));

    Ok(MergedCollection { header, features })
}
