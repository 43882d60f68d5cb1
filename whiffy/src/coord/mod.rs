//! Geographic primitives
//!
//! Provides the coordinate, bounding box and region types used throughout the
//! retrieval engine, plus the quadrant split that drives subdivision.

mod types;

pub use types::{quad_split, BoundingBox, CoordError, LatLng, Region};
