use super::progress::tests::RecordingProgress;
use super::*;
use crate::coord::LatLng;
use crate::feature::{DecodeError, Feature};
use serde_json::{json, Map};
use std::sync::atomic::AtomicUsize;

/// Source answering from a function of the region.
struct FnSource<F> {
    respond: F,
    calls: AtomicUsize,
}

impl<F> FnSource<F>
where
    F: Fn(&Region) -> WhiffyResult<FeatureSet> + Send + Sync,
{
    fn new(respond: F) -> Self {
        Self {
            respond,
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<F> FeatureSource for FnSource<F>
where
    F: Fn(&Region) -> WhiffyResult<FeatureSet> + Send + Sync,
{
    fn fetch(&self, region: &Region) -> WhiffyResult<FeatureSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(region)
    }
}

fn features(count: usize) -> FeatureSet {
    let features = (0..count)
        .map(|i| Feature {
            id: None,
            geometry: json!(null),
            properties: json!({ "gid": i }).as_object().cloned().unwrap_or_default(),
            extra: Map::new(),
        })
        .collect();
    FeatureSet {
        features,
        attributes: Map::new(),
    }
}

fn bounds() -> BoundingBox {
    BoundingBox::new(LatLng::new(16.0, 16.0), LatLng::new(0.0, 0.0)).unwrap()
}

fn center(region: &Region) -> LatLng {
    LatLng::new(
        region.bbox.sw.lat + region.bbox.height() / 2.0,
        region.bbox.sw.lng + region.bbox.width() / 2.0,
    )
}

/// Root 12, children SW 4 / SE 7 / NW 15 / NE 9, grandchildren 3 each.
fn scenario(region: &Region) -> WhiffyResult<FeatureSet> {
    let count = match region.depth {
        0 => 12,
        1 => {
            let c = center(region);
            match (c.lat < 8.0, c.lng < 8.0) {
                (true, true) => 4,
                (true, false) => 7,
                (false, true) => 15,
                (false, false) => 9,
            }
        }
        _ => 3,
    };
    Ok(features(count))
}

fn engine<S: FeatureSource>(source: S, config: EngineConfig) -> PartitionEngine<S, NoProgress> {
    PartitionEngine::new(source, config)
        .unwrap()
        .with_progress(NoProgress)
}

#[test]
fn test_accepting_root_yields_single_region() {
    let source = FnSource::new(|_: &Region| Ok(features(3)));
    let engine = engine(source, EngineConfig::default());

    let frontier = engine.retrieve(bounds(), |_| true).unwrap();

    assert_eq!(frontier.len(), 1);
    assert_eq!(frontier.entries()[0].region, Region::root(bounds()));
    assert_eq!(frontier.entries()[0].acceptance, Acceptance::Accepted);
    assert_eq!(frontier.stats().splits, 0);
    assert_eq!(frontier.stats().levels, 1);
    assert_eq!(engine.source().call_count(), 1);
}

#[test]
fn test_scenario_frontier() {
    let limit = FeatureLimit::new(10);
    let engine = engine(FnSource::new(scenario), EngineConfig::default().with_parallelism(1));

    let frontier = engine.retrieve(bounds(), |set| limit.accepts(set)).unwrap();

    assert_eq!(frontier.len(), 7);
    assert_eq!(engine.source().call_count(), 9);

    // Accepted level-1 quadrants first (SW, SE, NE), then NW's children
    let root = Region::root(bounds());
    let [sw, se, nw, ne] = root.children();
    let expected: Vec<Region> = [sw, se, ne].into_iter().chain(nw.children()).collect();
    let got: Vec<Region> = frontier.regions().copied().collect();
    assert_eq!(got, expected);

    let stats = frontier.stats();
    assert_eq!(stats.regions_fetched, 9);
    assert_eq!(stats.splits, 2);
    assert_eq!(stats.levels, 3);
    assert_eq!(stats.max_depth, 2);
    assert!(!frontier.is_partial());
}

#[test]
fn test_frontier_tiles_bounds() {
    let limit = FeatureLimit::new(10);
    let engine = engine(FnSource::new(scenario), EngineConfig::default());

    let frontier = engine.retrieve(bounds(), |set| limit.accepts(set)).unwrap();

    let area: f64 = frontier
        .regions()
        .map(|r| r.bbox.height() * r.bbox.width())
        .sum();
    assert_eq!(area, bounds().height() * bounds().width());
}

#[test]
fn test_parallel_and_sequential_frontiers_match() {
    let limit = FeatureLimit::new(10);
    let sequential = engine(FnSource::new(scenario), EngineConfig::default().with_parallelism(1));
    let parallel = engine(FnSource::new(scenario), EngineConfig::default().with_parallelism(4));

    let a = sequential.retrieve(bounds(), |set| limit.accepts(set)).unwrap();
    let b = parallel.retrieve(bounds(), |set| limit.accepts(set)).unwrap();

    assert_eq!(a, b);
}

#[test]
fn test_depth_cap_marks_regions_instead_of_looping() {
    let source = FnSource::new(|_: &Region| Ok(features(50)));
    let engine = engine(source, EngineConfig::default().with_max_depth(Some(2)));

    let frontier = engine.retrieve(bounds(), |set| set.len() < 10).unwrap();

    assert_eq!(frontier.len(), 16);
    assert!(frontier
        .entries()
        .iter()
        .all(|e| e.acceptance == Acceptance::DepthLimited && e.region.depth == 2));
    assert_eq!(frontier.stats().depth_limited, 16);
    assert_eq!(frontier.stats().splits, 5);
    assert_eq!(frontier.entries()[0].features, 50);
    assert!(frontier.is_partial());
}

#[test]
fn test_zero_depth_cap_keeps_root() {
    let source = FnSource::new(|_: &Region| Ok(features(50)));
    let engine = engine(source, EngineConfig::default().with_max_depth(Some(0)));

    let frontier = engine.retrieve(bounds(), |_| false).unwrap();

    assert_eq!(frontier.len(), 1);
    assert_eq!(frontier.entries()[0].acceptance, Acceptance::DepthLimited);
}

#[test]
fn test_unbounded_depth_keeps_splitting() {
    // Only regions at depth 5 are small enough
    let source = FnSource::new(|r: &Region| Ok(features(if r.depth >= 5 { 0 } else { 20 })));
    let engine = engine(source, EngineConfig::default().with_max_depth(None));

    let frontier = engine.retrieve(bounds(), |set| set.len() < 10).unwrap();

    assert_eq!(frontier.len(), 4usize.pow(5));
    assert_eq!(frontier.stats().max_depth, 5);
}

#[test]
fn test_fetch_error_aborts_run() {
    let source = FnSource::new(|r: &Region| {
        if r.depth == 1 {
            Err(WhiffyError::Decode {
                region: *r,
                source: DecodeError::MissingIdentifier {
                    field: "gid".to_string(),
                },
            })
        } else {
            Ok(features(20))
        }
    });
    let engine = engine(source, EngineConfig::default().with_parallelism(1));

    let result = engine.retrieve(bounds(), |set| set.len() < 10);

    assert!(matches!(result, Err(WhiffyError::Decode { region, .. }) if region.depth == 1));
    // Sequential fetching stops at the first failure
    assert_eq!(engine.source().call_count(), 2);
}

#[test]
fn test_cancelled_before_start() {
    let cancel = CancelFlag::new();
    cancel.cancel();
    let engine = engine(FnSource::new(scenario), EngineConfig::default()).with_cancel_flag(cancel);

    let result = engine.retrieve(bounds(), |_| true);

    assert!(matches!(result, Err(WhiffyError::Cancelled { levels: 0 })));
    assert_eq!(engine.source().call_count(), 0);
}

#[test]
fn test_cancelled_between_levels() {
    let cancel = CancelFlag::new();
    let trigger = cancel.clone();
    let source = FnSource::new(move |_: &Region| {
        trigger.cancel();
        Ok(features(20))
    });
    let engine = engine(source, EngineConfig::default()).with_cancel_flag(cancel);

    let result = engine.retrieve(bounds(), |set| set.len() < 10);

    assert!(matches!(result, Err(WhiffyError::Cancelled { levels: 1 })));
    assert_eq!(engine.source().call_count(), 1);
}

#[test]
fn test_zero_parallelism_is_rejected() {
    let source = FnSource::new(scenario);
    let result = PartitionEngine::new(source, EngineConfig::default().with_parallelism(0));
    assert!(matches!(result, Err(WhiffyError::Config(_))));
}

#[test]
fn test_progress_events_follow_queue_order() {
    let limit = FeatureLimit::new(10);
    let engine = PartitionEngine::new(FnSource::new(scenario), EngineConfig::default())
        .unwrap()
        .with_progress(RecordingProgress::default());

    engine.retrieve(bounds(), |set| limit.accepts(set)).unwrap();

    let progress = engine.progress();
    assert_eq!(*progress.levels.lock().unwrap(), vec![(0, 1), (1, 4), (2, 4)]);

    let events = progress.events.lock().unwrap();
    let decisions: Vec<Decision> = events.iter().map(|e| e.decision).collect();
    assert_eq!(
        decisions,
        vec![
            Decision::Split,
            Decision::Accepted,
            Decision::Accepted,
            Decision::Split,
            Decision::Accepted,
            Decision::Accepted,
            Decision::Accepted,
            Decision::Accepted,
            Decision::Accepted,
        ]
    );
    assert_eq!(events[3].features, 15);
    assert_eq!(events[3].index, 2);
    assert_eq!(events[3].level_size, 4);

    let finished = progress.finished.lock().unwrap();
    assert_eq!(finished.as_ref().map(|s| s.regions_fetched), Some(9));
}

#[test]
fn test_feature_limit_is_strict() {
    let limit = FeatureLimit::new(10);
    assert!(limit.accepts(&features(9)));
    assert!(!limit.accepts(&features(10)));
    assert!(!limit.accepts(&features(11)));
}
