//! # Shape Classification
//!
//! Decides what kind of path this is (loop, out-and-back, one-way, figure-of-eight)
//! and which way it is travelled.
//!
//! ## Algorithm
//! 1. **Matched points**: for each point, the first later point (at least
//!    `match_buffer` indices on) within `match_distance_m`. A high share of
//!    matched points means the path revisits its own ground.
//! 2. **Bearing analysis**: bearings from an origin to evenly strided samples.
//!    Consistent turning in one direction drives the rotation score towards ±1.
//!    Run once from the bounding-box center (is it rotating?) and once from
//!    the start point (how wide an arc does it sweep?).
//! 3. **Classification** from loop closure, shared percentage and rotation.
//! 4. **Direction**: compass heading for straight one-way paths, winding for loops.

use std::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::geo_utils::{angular_delta, bearing, haversine_distance, Cardinal};
use crate::{Bounds, GpsPoint, OptionExt, PathError, Result};

/// Samples closer than this to the bearing origin have no meaningful bearing.
const MIN_BEARING_DISTANCE_M: f64 = 1.0;

/// Configuration for shape classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    /// Minimum index gap between matched points. Default: 10
    pub match_buffer: usize,
    /// Maximum distance between matched points (meters). Default: 100.0
    pub match_distance_m: f64,
    /// Number of bearing samples along the path. Default: 100
    pub bearing_sections: usize,
    /// Bearing changes at or below this are ignored (degrees). Default: 1.0
    pub cw_tolerance_deg: f64,
    /// Start/end closer than this make a closed loop (meters). Default: 250.0
    pub close_loop_threshold_m: f64,
    /// Shared percentage below which a path doesn't revisit itself. Default: 10.0
    pub low_share_pct: f64,
    /// Shared percentage above which a loop is an out-and-back. Default: 40.0
    pub high_share_pct: f64,
    /// Rotation score magnitude above which a path is rotational. Default: 0.15
    pub rotation_threshold: f64,
    /// One-way paths sweeping less than this are linear (degrees). Default: 135.0
    pub rotation_range_tolerance_deg: f64,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            match_buffer: 10,
            match_distance_m: 100.0,
            bearing_sections: 100,
            cw_tolerance_deg: 1.0,
            close_loop_threshold_m: 250.0,
            low_share_pct: 10.0,
            high_share_pct: 40.0,
            rotation_threshold: 0.15,
            rotation_range_tolerance_deg: 135.0,
        }
    }
}

/// Overall shape of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathCategory {
    Circular,
    OutAndBack,
    OneWay,
    FigureOfEight,
    /// Could not be categorized
    None,
}

impl fmt::Display for PathCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PathCategory::Circular => "Circular",
            PathCategory::OutAndBack => "Out and back",
            PathCategory::OneWay => "One way",
            PathCategory::FigureOfEight => "Figure of eight",
            PathCategory::None => "Uncategorized",
        };
        f.write_str(name)
    }
}

/// Direction of travel.
///
/// Serialized as its display string, e.g. `"West to East"` or `"Clockwise"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Direction {
    Clockwise,
    AntiClockwise,
    /// Straight-line travel between two compass points
    Linear { from: Cardinal, to: Cardinal },
    NoDirection,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Clockwise => f.write_str("Clockwise"),
            Direction::AntiClockwise => f.write_str("Anti-clockwise"),
            Direction::Linear { from, to } => write!(f, "{} to {}", from, to),
            Direction::NoDirection => f.write_str("No direction"),
        }
    }
}

impl From<Direction> for String {
    fn from(direction: Direction) -> Self {
        direction.to_string()
    }
}

impl TryFrom<String> for Direction {
    type Error = PathError;

    fn try_from(s: String) -> Result<Self> {
        match s.as_str() {
            "Clockwise" => Ok(Direction::Clockwise),
            "Anti-clockwise" => Ok(Direction::AntiClockwise),
            "No direction" => Ok(Direction::NoDirection),
            linear => {
                let (from, to) = linear
                    .split_once(" to ")
                    .ok_or_invalid_input(&format!("unknown direction '{}'", linear))?;
                Ok(Direction::Linear {
                    from: from.parse()?,
                    to: to.parse()?,
                })
            }
        }
    }
}

/// Result of [`classify`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeAnalysis {
    pub category: PathCategory,
    pub direction: Direction,
    /// Index pairs `(i, j)`, `i < j`, of geometrically coincident points
    pub matched_points: Vec<(usize, usize)>,
    /// Signed turning score around the bounding-box center; negative is clockwise
    pub rotation_score: f64,
    /// Angle swept as seen from the start point (degrees)
    pub bearing_range: f64,
    /// Percentage of points with a match
    pub pct_shared: f64,
}

/// Turning statistics around one origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BearingAnalysis {
    pub rotation_score: f64,
    pub bearing_range: f64,
}

/// Classify a simplified path.
pub fn classify(
    points: &[GpsPoint],
    cumulative_distance: &[f64],
    bounds: &Bounds,
    config: &ShapeConfig,
) -> ShapeAnalysis {
    let total_distance = cumulative_distance.last().copied().unwrap_or(0.0);
    if points.len() < 2 || total_distance <= 0.0 {
        return ShapeAnalysis {
            category: PathCategory::None,
            direction: Direction::NoDirection,
            matched_points: Vec::new(),
            rotation_score: 0.0,
            bearing_range: 0.0,
            pct_shared: 0.0,
        };
    }

    let matched_points = find_matched_points(points, config);
    let pct_shared = 100.0 * matched_points.len() as f64 / points.len() as f64;

    let rotation_score = bearing_analysis(points, &bounds.center(), config).rotation_score;
    let bearing_range = bearing_analysis(points, &points[0], config).bearing_range;

    let is_closed_loop =
        haversine_distance(&points[0], &points[points.len() - 1]) < config.close_loop_threshold_m;

    let category = categorize(is_closed_loop, pct_shared, rotation_score, config);
    let direction = travel_direction(category, rotation_score, bearing_range, points, config);

    debug!(
        "[Shape] closed={} shared={:.1}% rotation={:.3} range={:.1}",
        is_closed_loop, pct_shared, rotation_score, bearing_range
    );
    info!("[Shape] {} points classified as {} ({})", points.len(), category, direction);

    ShapeAnalysis {
        category,
        direction,
        matched_points,
        rotation_score,
        bearing_range,
        pct_shared,
    }
}

/// Pairs `(i, j)` where `j` is the first point at least `match_buffer` on
/// from `i` that lies within `match_distance_m` of it.
///
/// While far from `i` the scan skips ahead proportionally to the distance,
/// which keeps typical paths well below quadratic cost.
pub fn find_matched_points(points: &[GpsPoint], config: &ShapeConfig) -> Vec<(usize, usize)> {
    let n = points.len();
    let far = 10.0 * config.match_distance_m;
    let mut matched = Vec::new();

    for i in 0..n {
        let mut j = i + config.match_buffer.max(1);
        while j < n {
            let d = haversine_distance(&points[i], &points[j]);
            if d < config.match_distance_m {
                matched.push((i, j));
                break;
            }
            j += if d > far {
                ((0.5 * d / config.match_distance_m).round() as usize).max(1)
            } else {
                1
            };
        }
    }

    matched
}

/// Bearing statistics of strided samples as seen from `origin`.
///
/// Each bearing change larger than `cw_tolerance_deg` counts one step,
/// `-1` for clockwise and `+1` for anti-clockwise; the score is the count
/// over `bearing_sections`. The range is measured on the unwrapped bearing
/// sequence so it isn't fooled by crossing north.
pub fn bearing_analysis(
    points: &[GpsPoint],
    origin: &GpsPoint,
    config: &ShapeConfig,
) -> BearingAnalysis {
    let sections = config.bearing_sections.max(1);
    let stride = points.len().div_ceil(sections).max(1);

    let bearings: Vec<f64> = points
        .iter()
        .step_by(stride)
        .filter(|p| haversine_distance(origin, p) >= MIN_BEARING_DISTANCE_M)
        .map(|p| bearing(origin, p))
        .collect();

    let mut counter: i64 = 0;
    let mut unwrapped = bearings.first().copied().unwrap_or(0.0);
    let mut min_unwrapped = unwrapped;
    let mut max_unwrapped = unwrapped;

    for pair in bearings.windows(2) {
        let delta = angular_delta(pair[0], pair[1]);
        if delta.abs() > config.cw_tolerance_deg {
            counter -= delta.signum() as i64;
        }
        unwrapped += delta;
        min_unwrapped = min_unwrapped.min(unwrapped);
        max_unwrapped = max_unwrapped.max(unwrapped);
    }

    BearingAnalysis {
        rotation_score: counter as f64 / sections as f64,
        bearing_range: max_unwrapped - min_unwrapped,
    }
}

/// First matching rule wins; anything left over is uncategorized.
pub fn categorize(
    is_closed_loop: bool,
    pct_shared: f64,
    rotation_score: f64,
    config: &ShapeConfig,
) -> PathCategory {
    let rotating = rotation_score.abs() > config.rotation_threshold;

    if !is_closed_loop && pct_shared < config.low_share_pct {
        PathCategory::OneWay
    } else if is_closed_loop && rotating {
        PathCategory::Circular
    } else if is_closed_loop && pct_shared < config.low_share_pct {
        PathCategory::FigureOfEight
    } else if is_closed_loop && pct_shared > config.high_share_pct {
        PathCategory::OutAndBack
    } else {
        PathCategory::None
    }
}

/// Travel direction for an already categorized path.
pub fn travel_direction(
    category: PathCategory,
    rotation_score: f64,
    bearing_range: f64,
    points: &[GpsPoint],
    config: &ShapeConfig,
) -> Direction {
    let one_way = category == PathCategory::OneWay;

    if one_way && bearing_range < config.rotation_range_tolerance_deg && points.len() >= 2 {
        let heading = bearing(&points[0], &points[points.len() - 1]);
        let to = Cardinal::from_bearing(heading);
        return Direction::Linear { from: to.opposite(), to };
    }

    if category == PathCategory::Circular || (one_way && rotation_score > config.rotation_threshold)
    {
        if rotation_score > 0.0 {
            return Direction::AntiClockwise;
        }
        if rotation_score < 0.0 {
            return Direction::Clockwise;
        }
    }

    Direction::NoDirection
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::{compute_bounds, cumulative_distance};

    /// Circle of `n` points, ~1km radius, anti-clockwise when `ccw`.
    fn circle(n: usize, ccw: bool) -> Vec<GpsPoint> {
        (0..n)
            .map(|i| {
                let mut angle = i as f64 / n as f64 * std::f64::consts::TAU;
                if !ccw {
                    angle = -angle;
                }
                GpsPoint::new(46.0 + 0.009 * angle.sin(), 8.0 + 0.013 * angle.cos())
            })
            .collect()
    }

    fn run(points: &[GpsPoint]) -> ShapeAnalysis {
        let cumulative = cumulative_distance(points);
        classify(points, &cumulative, &compute_bounds(points), &ShapeConfig::default())
    }

    #[test]
    fn test_matched_points_respect_buffer() {
        // Back and forth over the same 5 points: neighbours must not match
        let line: Vec<GpsPoint> = (0..5).map(|i| GpsPoint::new(46.0, 8.0 + i as f64 * 0.0001)).collect();
        let matched = find_matched_points(&line, &ShapeConfig::default());
        assert!(matched.is_empty());
    }

    #[test]
    fn test_matched_points_first_match_only() {
        let out: Vec<GpsPoint> = (0..30).map(|i| GpsPoint::new(46.0 + i as f64 * 0.00045, 8.0)).collect();
        let mut path = out.clone();
        path.extend(out.iter().rev().skip(1));

        let matched = find_matched_points(&path, &ShapeConfig::default());
        assert!(!matched.is_empty());
        for &(i, j) in &matched {
            assert!(j >= i + 10);
            assert!(haversine_distance(&path[i], &path[j]) < 100.0);
            // At most one pair per i
            assert_eq!(matched.iter().filter(|(a, _)| *a == i).count(), 1);
        }
    }

    #[test]
    fn test_skip_ahead_still_finds_distant_return() {
        // 10km out, 10km back on the same line
        let out: Vec<GpsPoint> = (0..500).map(|i| GpsPoint::new(46.0 + i as f64 * 0.00018, 8.0)).collect();
        let mut path = out.clone();
        path.extend(out.iter().rev().skip(1));
        let matched = find_matched_points(&path, &ShapeConfig::default());
        assert!(matched.iter().any(|&(i, _)| i == 0));
    }

    #[test]
    fn test_rotation_sign() {
        let config = ShapeConfig::default();
        let cw = circle(200, false);
        let ccw = circle(200, true);
        let center = compute_bounds(&cw).center();

        let cw_score = bearing_analysis(&cw, &center, &config).rotation_score;
        let ccw_score = bearing_analysis(&ccw, &center, &config).rotation_score;
        assert!(cw_score < -0.5, "clockwise score {}", cw_score);
        assert!(ccw_score > 0.5, "anti-clockwise score {}", ccw_score);
    }

    #[test]
    fn test_bearing_range_straight_line_is_small() {
        let line: Vec<GpsPoint> = (0..50).map(|i| GpsPoint::new(46.0 + i as f64 * 0.001, 8.0)).collect();
        let analysis = bearing_analysis(&line, &line[0], &ShapeConfig::default());
        assert!(analysis.bearing_range < 1.0);
    }

    #[test]
    fn test_bearing_range_ignores_north_wraparound() {
        // Wiggling either side of due north from the start
        let line: Vec<GpsPoint> = (0..50)
            .map(|i| {
                let wiggle = if i % 2 == 0 { 0.0001 } else { -0.0001 };
                GpsPoint::new(46.0 + i as f64 * 0.001, 8.0 + wiggle)
            })
            .collect();
        let analysis = bearing_analysis(&line, &line[0], &ShapeConfig::default());
        assert!(analysis.bearing_range < 90.0);
    }

    #[test]
    fn test_categorize_rules() {
        let config = ShapeConfig::default();
        assert_eq!(categorize(false, 5.0, 0.0, &config), PathCategory::OneWay);
        assert_eq!(categorize(false, 5.0, 0.9, &config), PathCategory::OneWay);
        assert_eq!(categorize(true, 30.0, -0.4, &config), PathCategory::Circular);
        assert_eq!(categorize(true, 5.0, 0.05, &config), PathCategory::FigureOfEight);
        assert_eq!(categorize(true, 45.0, 0.05, &config), PathCategory::OutAndBack);
        // Closed, not rotating, shared between thresholds
        assert_eq!(categorize(true, 25.0, 0.05, &config), PathCategory::None);
        // Open but revisiting itself
        assert_eq!(categorize(false, 25.0, 0.0, &config), PathCategory::None);
    }

    #[test]
    fn test_travel_direction_rules() {
        let config = ShapeConfig::default();
        let north: Vec<GpsPoint> = vec![GpsPoint::new(46.0, 8.0), GpsPoint::new(46.1, 8.0)];

        assert_eq!(
            travel_direction(PathCategory::OneWay, 0.0, 10.0, &north, &config),
            Direction::Linear { from: Cardinal::South, to: Cardinal::North }
        );
        assert_eq!(
            travel_direction(PathCategory::OneWay, 0.3, 200.0, &north, &config),
            Direction::AntiClockwise
        );
        assert_eq!(
            travel_direction(PathCategory::OneWay, -0.3, 200.0, &north, &config),
            Direction::NoDirection
        );
        assert_eq!(
            travel_direction(PathCategory::Circular, -0.3, 200.0, &north, &config),
            Direction::Clockwise
        );
        assert_eq!(
            travel_direction(PathCategory::OutAndBack, 0.3, 10.0, &north, &config),
            Direction::NoDirection
        );
    }

    #[test]
    fn test_circle_is_circular() {
        let mut points = circle(120, true);
        points.push(points[0]);
        let analysis = run(&points);
        assert_eq!(analysis.category, PathCategory::Circular);
        assert_eq!(analysis.direction, Direction::AntiClockwise);
    }

    #[test]
    fn test_zero_length_path_uncategorized() {
        let points = vec![GpsPoint::new(46.0, 8.0); 3];
        let analysis = run(&points);
        assert_eq!(analysis.category, PathCategory::None);
        assert_eq!(analysis.direction, Direction::NoDirection);
    }

    #[test]
    fn test_direction_display() {
        let d = Direction::Linear { from: Cardinal::West, to: Cardinal::East };
        assert_eq!(d.to_string(), "West to East");
        assert_eq!(Direction::AntiClockwise.to_string(), "Anti-clockwise");
    }

    #[test]
    fn test_direction_serializes_as_string() {
        let linear = Direction::Linear { from: Cardinal::South, to: Cardinal::North };
        assert_eq!(serde_json::to_value(linear).unwrap(), serde_json::json!("South to North"));
        assert_eq!(serde_json::to_value(Direction::Clockwise).unwrap(), serde_json::json!("Clockwise"));

        for direction in [
            linear,
            Direction::Linear { from: Cardinal::SouthWest, to: Cardinal::NorthEast },
            Direction::AntiClockwise,
            Direction::NoDirection,
        ] {
            let json = serde_json::to_string(&direction).unwrap();
            assert_eq!(serde_json::from_str::<Direction>(&json).unwrap(), direction);
        }
        assert!(serde_json::from_str::<Direction>("\"Sideways\"").is_err());
        assert!(serde_json::from_str::<Direction>("\"Up to Down\"").is_err());
    }
}
