//! # Path Analyzer
//!
//! Structured analysis of travelled GPS paths.
//!
//! This library provides:
//! - Path preprocessing (validation, Douglas-Peucker simplification, elevation backfill)
//! - Elevation profiling (smoothing, ascent/descent, hill segmentation)
//! - Shape classification (circular, out-and-back, one-way, figure-of-eight) and travel direction
//! - Colour-segmented GeoJSON output for map overlays
//! - A process-wide worker pool that runs analyses off the request-handling threads
//!
//! ## Features
//!
//! - **`http`** - Enable the HTTP elevation lookup client
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use path_analyzer::{analyze_offline, AnalysisConfig, GpsPoint};
//!
//! // A straight line heading east
//! let points: Vec<GpsPoint> = (0..300)
//!     .map(|i| GpsPoint::new(51.5, -0.2 + i as f64 * 0.0005))
//!     .collect();
//!
//! let path = analyze_offline(&points, None, &AnalysisConfig::default()).unwrap();
//! println!("{} heading {}", path.category, path.direction);
//! ```

use geo::Point;
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, PathError, Result};

// Tunable thresholds for every stage
pub mod config;
pub use config::AnalysisConfig;

// Geographic utilities (distance, bearing, bounds)
pub mod geo_utils;

// Simplification and elevation backfill
pub mod preflight;
pub use preflight::{
    preflight, simplify_path, ElevationLookup, NoElevationLookup, PreflightConfig,
    PreflightResult,
};

// Elevation smoothing, ascent/descent and hills
pub mod elevation;
pub use elevation::{analyze_elevation, ElevationAnalysis, ElevationConfig, Hill};

// Shape classification and travel direction
pub mod shape;
pub use shape::{classify, Direction, PathCategory, ShapeAnalysis, ShapeConfig};

// Colour-coded map segments
pub mod segments;
pub use segments::{render_segments, SegmentKind};

// Analysis facade
pub mod analysis;
pub use analysis::{
    analyze, analyze_offline, analyze_preflighted, AnalyzedPath, DistanceStats,
    ElevationStats, PathAnalyzer,
};

// Worker pool for CPU-bound analysis
pub mod pool;
pub use pool::{PoolConfig, WorkerPool, WorkerPoolBuilder};

// Raw GPX input adapter
pub mod gpx_input;
pub use gpx_input::{parse_gpx, PathKind, RawPath};

// HTTP elevation lookup
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::HttpElevationLookup;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use path_analyzer::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Create a point from a `[lng, lat]` pair.
    pub fn from_lng_lat(coord: [f64; 2]) -> Self {
        Self::new(coord[1], coord[0])
    }

    /// The point as a `[lng, lat]` pair.
    pub fn lng_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    pub(crate) fn to_geo(self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// Bounding box for a path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(geo_utils::compute_bounds(points))
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(51.5074, -0.1278).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_lng_lat_conversion() {
        let p = GpsPoint::from_lng_lat([-0.1278, 51.5074]);
        assert_eq!(p.latitude, 51.5074);
        assert_eq!(p.longitude, -0.1278);
        assert_eq!(p.lng_lat(), [-0.1278, 51.5074]);
    }

    #[test]
    fn test_bounds_center() {
        let points = vec![GpsPoint::new(51.50, -0.10), GpsPoint::new(51.52, -0.12)];
        let bounds = Bounds::from_points(&points).unwrap();
        let center = bounds.center();
        assert!((center.latitude - 51.51).abs() < 1e-9);
        assert!((center.longitude + 0.11).abs() < 1e-9);
        assert!(Bounds::from_points(&[]).is_none());
    }
}
