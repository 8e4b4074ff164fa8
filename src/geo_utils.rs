//! # Geographic Utilities
//!
//! Core geographic computation utilities shared by every analysis stage.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`bearing`] | Initial compass bearing from one point to another |
//! | [`cumulative_distance`] | Running distance along a track, starting at 0 |
//! | [`compute_bounds`] | Bounding box of a GPS track |
//! | [`meters_to_degrees`] | Convert meters to approximate degrees at a latitude |
//! | [`Cardinal::from_bearing`] | Snap a bearing to the 8-point compass |
//!
//! ## Example
//!
//! ```rust
//! use path_analyzer::{GpsPoint, geo_utils};
//!
//! let track = vec![
//!     GpsPoint::new(51.5074, -0.1278),
//!     GpsPoint::new(51.5080, -0.1290),
//!     GpsPoint::new(51.5090, -0.1300),
//! ];
//!
//! let cumulative = geo_utils::cumulative_distance(&track);
//! assert_eq!(cumulative[0], 0.0);
//! println!("Track length: {:.0}m", cumulative[2]);
//! ```
//!
//! ## Coordinate System
//!
//! All functions expect WGS84 coordinates (latitude/longitude in degrees).
//! Distances use the haversine formula on a spherical Earth (radius 6,371 km).

use std::fmt;
use std::str::FromStr;

use geo::{Bearing, Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

use crate::{Bounds, GpsPoint, OptionExt, PathError, Result};

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two GPS points using the Haversine formula.
///
/// # Example
///
/// ```rust
/// use path_analyzer::{GpsPoint, geo_utils};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    Haversine::distance(p1.to_geo(), p2.to_geo())
}

/// Initial bearing from `from` to `to`, in degrees clockwise from north, in `[0, 360)`.
///
/// Identical points yield a bearing of 0.
#[inline]
pub fn bearing(from: &GpsPoint, to: &GpsPoint) -> f64 {
    let origin: Point<f64> = from.to_geo();
    Haversine::bearing(origin, to.to_geo()).rem_euclid(360.0)
}

/// Shortest signed angular difference `to - from`, in `(-180, 180]` degrees.
#[inline]
pub fn angular_delta(from: f64, to: f64) -> f64 {
    let mut delta = to - from;
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta <= -180.0 {
        delta += 360.0;
    }
    delta
}

/// Running distance along a track.
///
/// The result has the same length as `points`, starts at 0.0 and never
/// decreases.
pub fn cumulative_distance(points: &[GpsPoint]) -> Vec<f64> {
    let mut cumulative = Vec::with_capacity(points.len());
    let mut total = 0.0;

    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            total += haversine_distance(&points[i - 1], p);
        }
        cumulative.push(total);
    }

    cumulative
}

/// Convert meters to approximate degrees at a given latitude.
///
/// Uses the longitudinal degree length at `latitude`, which is the larger of
/// the two conversions and therefore the conservative one for tolerances.
#[inline]
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let lat_rad = latitude.to_radians();
    let meters_per_degree = 111_320.0 * lat_rad.cos().max(0.1);
    meters / meters_per_degree
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute the bounding box of a GPS track.
///
/// For empty input, returns bounds with MIN/MAX sentinels.
///
/// # Example
///
/// ```rust
/// use path_analyzer::{GpsPoint, geo_utils};
///
/// let track = vec![
///     GpsPoint::new(51.5000, -0.1300),
///     GpsPoint::new(51.5100, -0.1200),
///     GpsPoint::new(51.5050, -0.1250),
/// ];
///
/// let bounds = geo_utils::compute_bounds(&track);
/// assert_eq!(bounds.min_lat, 51.5000);
/// assert_eq!(bounds.max_lng, -0.1200);
/// ```
pub fn compute_bounds(points: &[GpsPoint]) -> Bounds {
    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lng = f64::MAX;
    let mut max_lng = f64::MIN;

    for p in points {
        min_lat = min_lat.min(p.latitude);
        max_lat = max_lat.max(p.latitude);
        min_lng = min_lng.min(p.longitude);
        max_lng = max_lng.max(p.longitude);
    }

    Bounds { min_lat, max_lat, min_lng, max_lng }
}

// =============================================================================
// Compass
// =============================================================================

/// One of the 8 compass points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinal {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Cardinal {
    const ALL: [Cardinal; 8] = [
        Cardinal::North,
        Cardinal::NorthEast,
        Cardinal::East,
        Cardinal::SouthEast,
        Cardinal::South,
        Cardinal::SouthWest,
        Cardinal::West,
        Cardinal::NorthWest,
    ];

    /// Snap a bearing in degrees to the nearest of 8 compass points.
    pub fn from_bearing(bearing: f64) -> Self {
        let sector = (bearing.rem_euclid(360.0) / 45.0).round() as usize % 8;
        Self::ALL[sector]
    }

    /// The compass point directly behind this one.
    pub fn opposite(self) -> Self {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + 4) % 8]
    }
}

impl fmt::Display for Cardinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Cardinal::North => "North",
            Cardinal::NorthEast => "North East",
            Cardinal::East => "East",
            Cardinal::SouthEast => "South East",
            Cardinal::South => "South",
            Cardinal::SouthWest => "South West",
            Cardinal::West => "West",
            Cardinal::NorthWest => "North West",
        };
        f.write_str(name)
    }
}

impl FromStr for Cardinal {
    type Err = PathError;

    /// Parse the display name ("North East", ...).
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.to_string() == s)
            .ok_or_invalid_input(&format!("unknown compass point '{}'", s))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
