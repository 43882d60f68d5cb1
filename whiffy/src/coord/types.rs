//! Geographic type definitions

use std::fmt;

use serde::{Deserialize, Serialize};

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude (north-south)
    pub lat: f64,
    /// Longitude (east-west)
    pub lng: f64,
}

impl LatLng {
    #[inline]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

/// Axis-aligned bounding box described by its northeast and southwest corners.
///
/// Invariant: `ne.lat >= sw.lat` and `ne.lng >= sw.lng`. Zero-area boxes are
/// allowed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Northeast corner
    pub ne: LatLng,
    /// Southwest corner
    pub sw: LatLng,
}

impl BoundingBox {
    /// Creates a bounding box, validating corner order and finiteness.
    pub fn new(ne: LatLng, sw: LatLng) -> Result<Self, CoordError> {
        for value in [ne.lat, ne.lng, sw.lat, sw.lng] {
            if !value.is_finite() {
                return Err(CoordError::NonFinite(value));
            }
        }
        if ne.lat < sw.lat || ne.lng < sw.lng {
            return Err(CoordError::InvertedBounds { ne, sw });
        }
        Ok(Self { ne, sw })
    }

    /// Latitude span in degrees.
    #[inline]
    pub fn height(&self) -> f64 {
        self.ne.lat - self.sw.lat
    }

    /// Longitude span in degrees.
    #[inline]
    pub fn width(&self) -> f64 {
        self.ne.lng - self.sw.lng
    }

    /// Returns `true` when the box covers no area.
    pub fn is_degenerate(&self) -> bool {
        self.height() == 0.0 || self.width() == 0.0
    }

    /// Extent in WFS/GeoJSON order: west, south, east, north.
    #[inline]
    pub fn to_wsen(&self) -> [f64; 4] {
        [self.sw.lng, self.sw.lat, self.ne.lng, self.ne.lat]
    }

    /// Returns `true` if the point lies inside the box or on its edge.
    pub fn contains(&self, point: LatLng) -> bool {
        (self.sw.lat..=self.ne.lat).contains(&point.lat)
            && (self.sw.lng..=self.ne.lng).contains(&point.lng)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ne {} sw {}]", self.ne, self.sw)
    }
}

/// A bounding box tagged with the subdivision depth it was produced at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Subdivision depth (0 for the root query bounds)
    pub depth: u32,
    /// Area covered by this region
    pub bbox: BoundingBox,
}

impl Region {
    /// The root region for a retrieval run.
    pub fn root(bbox: BoundingBox) -> Self {
        Self { depth: 0, bbox }
    }

    /// Splits this region into its four quadrants, one level deeper.
    pub fn children(&self) -> [Region; 4] {
        let depth = self.depth + 1;
        quad_split(&self.bbox).map(|bbox| Region { depth, bbox })
    }
}

/// Errors that can occur when constructing geographic values.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// The northeast corner lies south or west of the southwest corner
    InvertedBounds { ne: LatLng, sw: LatLng },
    /// A coordinate is NaN or infinite
    NonFinite(f64),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvertedBounds { ne, sw } => {
                write!(
                    f,
                    "Invalid bounds: northeast corner {} must not lie south or west of \
                     southwest corner {}",
                    ne, sw
                )
            }
            CoordError::NonFinite(value) => {
                write!(f, "Invalid coordinate: {} (must be finite)", value)
            }
        }
    }
}

impl std::error::Error for CoordError {}

/// Splits a bounding box into four equal quadrants.
///
/// Quadrants are returned in the fixed order SW, SE, NW, NE. Both axes are
/// bisected at a single shared midpoint, so neighbouring quadrants share
/// edges exactly and together cover the parent.
pub fn quad_split(bbox: &BoundingBox) -> [BoundingBox; 4] {
    let mid = LatLng::new(
        bbox.sw.lat + bbox.height() / 2.0,
        bbox.sw.lng + bbox.width() / 2.0,
    );

    [
        // SW
        BoundingBox { ne: mid, sw: bbox.sw },
        // SE
        BoundingBox {
            ne: LatLng::new(mid.lat, bbox.ne.lng),
            sw: LatLng::new(bbox.sw.lat, mid.lng),
        },
        // NW
        BoundingBox {
            ne: LatLng::new(bbox.ne.lat, mid.lng),
            sw: LatLng::new(mid.lat, bbox.sw.lng),
        },
        // NE
        BoundingBox { ne: bbox.ne, sw: mid },
    ]
}
