//! # Preflight
//!
//! Validates and simplifies a raw path, then backfills elevation when the
//! caller did not supply any.
//!
//! ## Algorithm
//! 1. Discard the elevation array if any entry is missing (no partial interpolation)
//! 2. Drop points with invalid coordinates (and their elevation entries)
//! 3. Short paths: remove coincident neighbours only. Longer paths: Douglas-Peucker
//!    with the mild tolerance
//! 4. Still above the long-path threshold: Douglas-Peucker again with the aggressive tolerance
//! 5. No elevations and below the long-path threshold: ask the [`ElevationLookup`]
//!
//! Steps 1-4 are pure and exposed as [`simplify_path`]; [`preflight`] adds step 5.

use std::future::Future;

use geo::{Coord, LineString, SimplifyIdx};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::geo_utils::{haversine_distance, meters_to_degrees};
use crate::{GpsPoint, PathError, Result};

/// Configuration for path simplification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreflightConfig {
    /// Paths with more points than this get Douglas-Peucker simplification.
    /// Default: 250
    pub short_threshold: usize,
    /// Paths still longer than this after the first pass are simplified again,
    /// and never get elevation backfill. Default: 1000
    pub long_threshold: usize,
    /// Consecutive points closer than this are treated as coincident (meters).
    /// Default: 0.5
    pub dedupe_tolerance_m: f64,
    /// First-pass Douglas-Peucker tolerance (meters). Default: 5.0
    pub mild_tolerance_m: f64,
    /// Second-pass Douglas-Peucker tolerance (meters). Default: 20.0
    pub aggressive_tolerance_m: f64,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            short_threshold: 250,
            long_threshold: 1000,
            dedupe_tolerance_m: 0.5,
            mild_tolerance_m: 5.0,
            aggressive_tolerance_m: 20.0,
        }
    }
}

/// Simplified path ready for analysis.
///
/// `elevations` is either empty or exactly as long as `points`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreflightResult {
    pub points: Vec<GpsPoint>,
    pub elevations: Vec<f64>,
}

impl PreflightResult {
    pub fn has_elevation(&self) -> bool {
        !self.elevations.is_empty()
    }
}

/// External terrain-elevation service.
///
/// Implementations return one elevation (meters) per input point, in order.
/// An empty result means "no elevation available" and is not an error.
pub trait ElevationLookup: Send + Sync {
    fn lookup(&self, points: &[GpsPoint]) -> impl Future<Output = Result<Vec<f64>>> + Send;
}

/// Lookup that never provides elevation data.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoElevationLookup;

impl ElevationLookup for NoElevationLookup {
    fn lookup(&self, _points: &[GpsPoint]) -> impl Future<Output = Result<Vec<f64>>> + Send {
        std::future::ready(Ok(Vec::new()))
    }
}

/// Validate and simplify a raw path, carrying supplied elevations along.
///
/// Returns `InvalidInput` if fewer than 2 valid points remain.
pub fn simplify_path(
    points: &[GpsPoint],
    elevations: Option<&[Option<f64>]>,
    config: &PreflightConfig,
) -> Result<PreflightResult> {
    if points.len() < 2 {
        return Err(PathError::invalid_input(format!(
            "path has {} points, minimum 2 required",
            points.len()
        )));
    }

    let elevations = usable_elevations(elevations, points.len());

    let (valid_points, valid_elevations): (Vec<GpsPoint>, Vec<f64>) = match &elevations {
        Some(elevs) => points
            .iter()
            .zip(elevs.iter())
            .filter(|(p, _)| p.is_valid())
            .map(|(p, e)| (*p, *e))
            .unzip(),
        None => (
            points.iter().filter(|p| p.is_valid()).copied().collect(),
            Vec::new(),
        ),
    };

    if valid_points.len() < 2 {
        return Err(PathError::invalid_input(format!(
            "path has {} valid points, minimum 2 required",
            valid_points.len()
        )));
    }
    if valid_points.len() < points.len() {
        warn!(
            "[Preflight] Dropped {} points with invalid coordinates",
            points.len() - valid_points.len()
        );
    }

    let mut keep: Vec<usize> = if valid_points.len() > config.short_threshold {
        debug!(
            "[Preflight] Simplifying {} points with tolerance {}m",
            valid_points.len(),
            config.mild_tolerance_m
        );
        douglas_peucker(&valid_points, config.mild_tolerance_m)
    } else {
        dedupe_coincident(&valid_points, config.dedupe_tolerance_m)
    };

    if keep.len() > config.long_threshold {
        debug!(
            "[Preflight] {} points still above {}, re-simplifying with tolerance {}m",
            keep.len(),
            config.long_threshold,
            config.aggressive_tolerance_m
        );
        let subset: Vec<GpsPoint> = keep.iter().map(|&i| valid_points[i]).collect();
        keep = douglas_peucker(&subset, config.aggressive_tolerance_m)
            .into_iter()
            .map(|i| keep[i])
            .collect();
    }

    let simplified: Vec<GpsPoint> = keep.iter().map(|&i| valid_points[i]).collect();
    let simplified_elevations: Vec<f64> = if valid_elevations.is_empty() {
        Vec::new()
    } else {
        keep.iter().map(|&i| valid_elevations[i]).collect()
    };

    info!(
        "[Preflight] Simplified {} -> {} points (elevation: {})",
        points.len(),
        simplified.len(),
        !simplified_elevations.is_empty()
    );

    Ok(PreflightResult {
        points: simplified,
        elevations: simplified_elevations,
    })
}

/// Simplify a raw path and backfill elevation from `lookup` if none was supplied.
///
/// Lookup is skipped for paths that remain at or above the long-path threshold.
/// Lookup failures are returned as `ElevationLookupFailed` without retrying.
pub async fn preflight<L: ElevationLookup>(
    points: &[GpsPoint],
    elevations: Option<&[Option<f64>]>,
    config: &PreflightConfig,
    lookup: &L,
) -> Result<PreflightResult> {
    let mut result = simplify_path(points, elevations, config)?;

    if result.has_elevation() {
        return Ok(result);
    }

    if result.points.len() >= config.long_threshold {
        info!(
            "[Preflight] Skipping elevation lookup for {} points (limit {})",
            result.points.len(),
            config.long_threshold
        );
        return Ok(result);
    }

    let fetched = lookup.lookup(&result.points).await?;
    if fetched.is_empty() {
        debug!("[Preflight] Elevation lookup returned no data");
        return Ok(result);
    }
    if fetched.len() != result.points.len() {
        return Err(PathError::lookup_failed(format!(
            "requested {} elevations, received {}",
            result.points.len(),
            fetched.len()
        )));
    }

    result.elevations = fetched;
    Ok(result)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Elevations are all-or-nothing: any gap or length mismatch discards the array.
fn usable_elevations(elevations: Option<&[Option<f64>]>, point_count: usize) -> Option<Vec<f64>> {
    let elevs = elevations?;
    if elevs.is_empty() {
        return None;
    }
    if elevs.len() != point_count {
        warn!(
            "[Preflight] Discarding {} elevations for {} points",
            elevs.len(),
            point_count
        );
        return None;
    }

    let complete: Option<Vec<f64>> = elevs
        .iter()
        .map(|e| e.filter(|v| v.is_finite()))
        .collect();
    if complete.is_none() {
        warn!("[Preflight] Discarding elevation data with missing values");
    }
    complete
}

/// Indices kept by Douglas-Peucker at a tolerance given in meters.
fn douglas_peucker(points: &[GpsPoint], tolerance_m: f64) -> Vec<usize> {
    let ref_lat = points.iter().map(|p| p.latitude).sum::<f64>() / points.len() as f64;
    let epsilon = meters_to_degrees(tolerance_m, ref_lat);

    let line = LineString::new(
        points
            .iter()
            .map(|p| Coord { x: p.longitude, y: p.latitude })
            .collect(),
    );
    line.simplify_idx(&epsilon)
}

/// Indices left after dropping points coincident with their kept predecessor.
/// Always keeps at least the first and last point.
fn dedupe_coincident(points: &[GpsPoint], tolerance_m: f64) -> Vec<usize> {
    let mut keep = vec![0];
    for (i, p) in points.iter().enumerate().skip(1) {
        let last = points[keep[keep.len() - 1]];
        if haversine_distance(&last, p) >= tolerance_m {
            keep.push(i);
        }
    }
    if keep.len() < 2 {
        keep.push(points.len() - 1);
    }
    keep
}

// ============================================================================
// Tests
// ============================================================================
