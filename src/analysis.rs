//! # Path Analysis
//!
//! Runs the whole pipeline: preflight, then shape classification and elevation
//! analysis side by side on the simplified path, assembled into an
//! [`AnalyzedPath`].
//!
//! Every entry point is a pure function of its input. Segment rendering is
//! left to the consumer via [`AnalyzedPath::render_segments`].

use std::sync::Arc;

use geojson::FeatureCollection;
use log::info;
use serde::{Deserialize, Serialize};

use crate::elevation::{analyze_elevation, ElevationAnalysis, Hill};
use crate::geo_utils::cumulative_distance;
use crate::pool::{spawn_detached, WorkerPool, TASK_ANALYZE_PREFLIGHTED};
use crate::preflight::{preflight, simplify_path, ElevationLookup, PreflightResult};
use crate::shape::{classify, Direction, PathCategory, ShapeAnalysis};
use crate::{segments, AnalysisConfig, Bounds, GpsPoint, OptionExt, PathError, Result};

/// Distance summary of the simplified path (meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceStats {
    pub total_distance: f64,
    pub max_point_to_point: f64,
    pub avg_point_to_point: f64,
}

/// Elevation summary (meters; lumpiness in meters per meter).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElevationStats {
    pub ascent: f64,
    pub descent: f64,
    pub max_elev: f64,
    pub min_elev: f64,
    pub lumpiness: f64,
}

/// Structured description of one travelled path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedPath {
    /// Simplified geometry (at least 2 points)
    pub points: Vec<GpsPoint>,
    /// Running distance, parallel to `points`, starting at 0
    pub cumulative_distance: Vec<f64>,
    pub bounding_box: Bounds,
    pub distance_stats: DistanceStats,
    /// Absent without elevation data
    pub elevation_stats: Option<ElevationStats>,
    /// Parallel to `points`; absent without elevation data
    pub smoothed_elevation: Option<Vec<f64>>,
    pub hills: Vec<Hill>,
    pub matched_points: Vec<(usize, usize)>,
    pub category: PathCategory,
    pub direction: Direction,
    pub rotation_score: f64,
}

impl AnalyzedPath {
    /// Percentage of points that have a geometric match further along the path.
    pub fn pct_shared(&self) -> f64 {
        100.0 * self.matched_points.len() as f64 / self.points.len().max(1) as f64
    }

    /// Colour-coded segments for map rendering.
    pub fn render_segments(&self) -> FeatureCollection {
        let elevations = self.smoothed_elevation.as_deref().unwrap_or(&[]);
        segments::render_segments(&self.points, elevations, &self.cumulative_distance, &self.hills)
    }
}

/// Analyze a path that has already been through preflight.
pub fn analyze_preflighted(path: &PreflightResult, config: &AnalysisConfig) -> Result<AnalyzedPath> {
    let points = &path.points;
    if points.len() < 2 {
        return Err(PathError::invalid_input(format!(
            "path has {} points, minimum 2 required",
            points.len()
        )));
    }

    let cumulative = cumulative_distance(points);
    let bounds = Bounds::from_points(points).ok_or_invalid_input("path has no points")?;
    let distance_stats = distance_stats(&cumulative);

    let (shape, elevation) = rayon::join(
        || classify(points, &cumulative, &bounds, &config.shape),
        || {
            analyze_elevation(
                points,
                &path.elevations,
                &cumulative,
                distance_stats.total_distance,
                &config.elevation,
            )
        },
    );

    Ok(assemble(points.clone(), cumulative, bounds, distance_stats, shape, elevation))
}

/// Analyze a raw path without elevation backfill.
///
/// Synchronous; this is what pool workers run.
pub fn analyze_offline(
    points: &[GpsPoint],
    elevations: Option<&[Option<f64>]>,
    config: &AnalysisConfig,
) -> Result<AnalyzedPath> {
    let simplified = simplify_path(points, elevations, &config.preflight)?;
    analyze_preflighted(&simplified, config)
}

/// Analyze a raw path, backfilling missing elevation from `lookup`.
pub async fn analyze<L: ElevationLookup>(
    points: &[GpsPoint],
    elevations: Option<&[Option<f64>]>,
    config: &AnalysisConfig,
    lookup: &L,
) -> Result<AnalyzedPath> {
    let simplified = preflight(points, elevations, &config.preflight, lookup).await?;
    analyze_preflighted(&simplified, config)
}

/// Analysis entry point for request handlers.
///
/// Preflight (including any elevation lookup) runs on the caller. The CPU-bound
/// stage goes to the attached worker pool, or to rayon's global pool when none
/// is attached, so the caller's executor thread is never blocked by it.
pub struct PathAnalyzer<L> {
    config: AnalysisConfig,
    lookup: L,
    pool: Option<Arc<WorkerPool>>,
}

impl<L: ElevationLookup> PathAnalyzer<L> {
    pub fn new(config: AnalysisConfig, lookup: L) -> Self {
        Self { config, lookup, pool: None }
    }

    /// Offload analysis to `pool`.
    pub fn with_pool(mut self, pool: Arc<WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub async fn analyze(
        &self,
        points: &[GpsPoint],
        elevations: Option<&[Option<f64>]>,
    ) -> Result<AnalyzedPath> {
        let simplified = preflight(points, elevations, &self.config.preflight, &self.lookup).await?;
        let config = self.config.clone();
        match &self.pool {
            Some(pool) => pool.analyze_preflighted(simplified, config).await,
            None => {
                spawn_detached(TASK_ANALYZE_PREFLIGHTED, move || {
                    analyze_preflighted(&simplified, &config)
                })
                .await
            }
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn distance_stats(cumulative: &[f64]) -> DistanceStats {
    let steps = cumulative.len().saturating_sub(1);
    let total_distance = cumulative.last().copied().unwrap_or(0.0);
    let max_point_to_point = cumulative
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(0.0, f64::max);
    let avg_point_to_point = if steps > 0 { total_distance / steps as f64 } else { 0.0 };

    DistanceStats {
        total_distance,
        max_point_to_point,
        avg_point_to_point,
    }
}

fn assemble(
    points: Vec<GpsPoint>,
    cumulative_distance: Vec<f64>,
    bounding_box: Bounds,
    distance_stats: DistanceStats,
    shape: ShapeAnalysis,
    elevation: Option<ElevationAnalysis>,
) -> AnalyzedPath {
    let (elevation_stats, smoothed_elevation, hills) = match elevation {
        Some(e) => (
            Some(ElevationStats {
                ascent: e.ascent,
                descent: e.descent,
                max_elev: e.max_elev,
                min_elev: e.min_elev,
                lumpiness: e.lumpiness,
            }),
            Some(e.smoothed),
            e.hills,
        ),
        None => (None, None, Vec::new()),
    };

    info!(
        "[Analysis] {} points, {:.0}m, {} / {}, {} hills",
        points.len(),
        distance_stats.total_distance,
        shape.category,
        shape.direction,
        hills.len()
    );

    AnalyzedPath {
        points,
        cumulative_distance,
        bounding_box,
        distance_stats,
        elevation_stats,
        smoothed_elevation,
        hills,
        matched_points: shape.matched_points,
        category: shape.category,
        direction: shape.direction,
        rotation_score: shape.rotation_score,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoElevationLookup;

    fn rolling_path(n: usize) -> (Vec<GpsPoint>, Vec<Option<f64>>) {
        let points = (0..n)
            .map(|i| GpsPoint::new(45.0 + i as f64 * 0.0002, 7.0 + (i as f64 * 0.05).sin() * 0.001))
            .collect();
        let elevations = (0..n)
            .map(|i| Some(500.0 + (i as f64 * 0.04).sin() * 60.0))
            .collect();
        (points, elevations)
    }

    #[test]
    fn test_invariants_with_elevation() {
        let (points, elevations) = rolling_path(200);
        let path = analyze_offline(&points, Some(&elevations), &AnalysisConfig::default()).unwrap();

        assert!(path.points.len() >= 2);
        assert_eq!(path.cumulative_distance.len(), path.points.len());
        assert_eq!(path.cumulative_distance[0], 0.0);
        assert!(path.cumulative_distance.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(path.smoothed_elevation.as_ref().unwrap().len(), path.points.len());
        assert!(path.elevation_stats.is_some());
        assert!(!path.hills.is_empty());
        for hill in &path.hills {
            assert!(hill.start_index < hill.end_index);
            assert!(hill.end_index < path.points.len());
        }
        for &(i, j) in &path.matched_points {
            assert!(i < j);
        }
    }

    #[test]
    fn test_without_elevation() {
        let (points, _) = rolling_path(100);
        let path = analyze_offline(&points, None, &AnalysisConfig::default()).unwrap();
        assert!(path.elevation_stats.is_none());
        assert!(path.smoothed_elevation.is_none());
        assert!(path.hills.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let (points, elevations) = rolling_path(300);
        let config = AnalysisConfig::default();
        let a = analyze_offline(&points, Some(&elevations), &config).unwrap();
        let b = analyze_offline(&points, Some(&elevations), &config).unwrap();
        assert_eq!(a.category, b.category);
        assert_eq!(a.direction, b.direction);
        assert_eq!(a.hills, b.hills);
        assert_eq!(a, b);
    }

    #[test]
    fn test_distance_stats() {
        let stats = distance_stats(&[0.0, 10.0, 30.0, 36.0]);
        assert_eq!(stats.total_distance, 36.0);
        assert_eq!(stats.max_point_to_point, 20.0);
        assert_eq!(stats.avg_point_to_point, 12.0);
    }

    #[test]
    fn test_rejects_single_point() {
        let result = analyze_offline(&[GpsPoint::new(45.0, 7.0)], None, &AnalysisConfig::default());
        assert!(matches!(result, Err(PathError::InvalidInput { .. })));
    }

    #[test]
    fn test_serializes_camel_case() {
        let (points, elevations) = rolling_path(60);
        let path = analyze_offline(&points, Some(&elevations), &AnalysisConfig::default()).unwrap();
        let value = serde_json::to_value(&path).unwrap();
        assert!(value.get("cumulativeDistance").is_some());
        assert!(value.get("boundingBox").is_some());
        let back: AnalyzedPath = serde_json::from_value(value).unwrap();
        assert_eq!(back.category, path.category);
    }

    #[test]
    fn test_direction_persists_as_text() {
        let points: Vec<GpsPoint> = (0..300)
            .map(|i| GpsPoint::new(51.5, -0.2 + i as f64 * 0.0005))
            .collect();
        let path = analyze_offline(&points, None, &AnalysisConfig::default()).unwrap();
        let value = serde_json::to_value(&path).unwrap();
        assert_eq!(value["direction"], serde_json::json!("West to East"));
        assert_eq!(value["category"], serde_json::json!("OneWay"));

        let back: AnalyzedPath = serde_json::from_value(value).unwrap();
        assert_eq!(back.direction, path.direction);
    }

    #[tokio::test]
    async fn test_async_matches_offline_without_lookup() {
        let (points, elevations) = rolling_path(120);
        let config = AnalysisConfig::default();
        let offline = analyze_offline(&points, Some(&elevations), &config).unwrap();
        let online = analyze(&points, Some(&elevations), &config, &NoElevationLookup)
            .await
            .unwrap();
        assert_eq!(offline, online);

        let analyzer = PathAnalyzer::new(config, NoElevationLookup);
        let via_analyzer = analyzer.analyze(&points, Some(&elevations)).await.unwrap();
        assert_eq!(offline, via_analyzer);
    }
}
