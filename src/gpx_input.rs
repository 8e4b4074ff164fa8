//! Raw GPX input.
//!
//! Turns GPX text into parallel coordinate/elevation/timestamp arrays. Tracks
//! are preferred (all segments joined in order); a file without tracks falls
//! back to its first route.

use gpx::{Gpx, Waypoint};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::analysis::{analyze_offline, AnalyzedPath};
use crate::{AnalysisConfig, GpsPoint, OptionExt, PathError, Result};

const UNTITLED: &str = "Untitled";

/// Whether the path was recorded (track) or planned (route).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathKind {
    Track,
    Route,
}

/// A path as read from a GPX file, before any processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPath {
    pub name: String,
    pub description: Option<String>,
    pub kind: PathKind,
    pub points: Vec<GpsPoint>,
    /// Present when at least one point carries an elevation
    pub elevations: Option<Vec<Option<f64>>>,
    /// ISO 8601 timestamps; present when at least one point carries a time
    pub timestamps: Option<Vec<Option<String>>>,
}

impl RawPath {
    /// Analyze this path without elevation backfill.
    pub fn analyze(&self, config: &AnalysisConfig) -> Result<AnalyzedPath> {
        analyze_offline(&self.points, self.elevations.as_deref(), config)
    }
}

/// Parse GPX text. Fails if the document is malformed or holds no coordinates.
pub fn parse_gpx(text: &str) -> Result<RawPath> {
    let gpx: Gpx = gpx::read(text.as_bytes())
        .map_err(|e| PathError::invalid_input_from(format!("malformed GPX: {}", e), e))?;

    let metadata_name = gpx.metadata.as_ref().and_then(|m| m.name.clone());
    let metadata_description = gpx.metadata.as_ref().and_then(|m| m.description.clone());

    let track_points: Vec<&Waypoint> = gpx
        .tracks
        .iter()
        .flat_map(|t| t.segments.iter())
        .flat_map(|s| s.points.iter())
        .collect();

    let (kind, name, description, waypoints) = if !track_points.is_empty() {
        let track = &gpx.tracks[0];
        (
            PathKind::Track,
            track.name.clone(),
            track.description.clone(),
            track_points,
        )
    } else {
        let route = gpx
            .routes
            .iter()
            .find(|r| !r.points.is_empty())
            .ok_or_invalid_input("no coordinate data found in GPX")?;
        (
            PathKind::Route,
            route.name.clone(),
            route.description.clone(),
            route.points.iter().collect(),
        )
    };

    let points: Vec<GpsPoint> = waypoints
        .iter()
        .map(|w| {
            let (lng, lat) = w.point().x_y();
            GpsPoint::from_lng_lat([lng, lat])
        })
        .collect();

    let elevations: Vec<Option<f64>> = waypoints.iter().map(|w| w.elevation).collect();
    let timestamps: Vec<Option<String>> = waypoints
        .iter()
        .map(|w| w.time.as_ref().and_then(|t| t.format().ok()))
        .collect();

    debug!(
        "[GpxInput] Read {:?} with {} points",
        kind,
        points.len()
    );

    Ok(RawPath {
        name: name
            .or(metadata_name)
            .unwrap_or_else(|| UNTITLED.to_string()),
        description: description.or(metadata_description),
        kind,
        points,
        elevations: elevations.iter().any(Option::is_some).then_some(elevations),
        timestamps: timestamps.iter().any(Option::is_some).then_some(timestamps),
    })
}
