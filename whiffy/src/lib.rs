//! Whiffy - Complete retrieval of capped WFS feature collections
//!
//! Many WFS servers cap the number of features a single `GetFeature`
//! request returns. This library retrieves every feature within a bounding
//! box anyway, by recursively splitting the area into quadrants until each
//! piece is small enough, then merging and deduplicating the pieces.
//!
//! # High-Level API
//!
//! For most use cases, the [`app`] module wires everything together:
//!
//! ```ignore
//! use whiffy::app::{Retrieval, RetrievalConfig};
//! use whiffy::coord::{BoundingBox, LatLng};
//! use whiffy::engine::FeatureLimit;
//! use whiffy::query::WfsQuery;
//!
//! let bounds = BoundingBox::new(LatLng::new(-14.0, 129.0), LatLng::new(-35.0, 112.0))?;
//! let query = WfsQuery::new("https://example.com/geoserver/wfs", "WCORP-001");
//!
//! let retrieval = Retrieval::wfs(query, &RetrievalConfig::default())?;
//! retrieval.run(bounds, FeatureLimit::new(10_000), std::io::stdout().lock())?;
//! ```

pub mod app;
pub mod cache;
pub mod config;
pub mod coord;
pub mod engine;
pub mod error;
pub mod feature;
pub mod logging;
pub mod merge;
pub mod output;
pub mod provider;
pub mod query;
pub mod retry;
pub mod source;

pub use error::{WhiffyError, WhiffyResult};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
