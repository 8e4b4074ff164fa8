//! Colour-coded GeoJSON segments for map overlays.
//!
//! Hills become "up"/"down" segments; every gap around them is filled with a
//! "flat" segment. Adjacent segments share their boundary point so the
//! rendered line has no breaks.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{GpsPoint, Hill};

/// Colour class of a rendered segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Flat,
    Up,
    Down,
}

impl SegmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Flat => "flat",
            SegmentKind::Up => "up",
            SegmentKind::Down => "down",
        }
    }

    /// Line colour used by the map overlay.
    pub fn colour(&self) -> &'static str {
        match self {
            SegmentKind::Flat => "#2b83ba",
            SegmentKind::Up => "#d7191c",
            SegmentKind::Down => "#1a9641",
        }
    }
}

/// A planned segment covering indices `[start, end]` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub start: usize,
    pub end: usize,
}

/// Split `[0, point_count - 1]` into flat gaps and hill segments, in path order.
pub fn plan_segments(point_count: usize, hills: &[Hill]) -> Vec<Segment> {
    if point_count == 0 {
        return Vec::new();
    }
    let last = point_count - 1;

    let mut segments = Vec::with_capacity(hills.len() * 2 + 1);
    let mut cursor = 0;
    for hill in hills {
        if hill.start_index > cursor {
            segments.push(Segment { kind: SegmentKind::Flat, start: cursor, end: hill.start_index });
        }
        let kind = if hill.is_ascent() { SegmentKind::Up } else { SegmentKind::Down };
        segments.push(Segment { kind, start: hill.start_index, end: hill.end_index });
        cursor = hill.end_index;
    }
    if cursor < last || segments.is_empty() {
        segments.push(Segment { kind: SegmentKind::Flat, start: cursor, end: last });
    }

    segments
}

/// Render a path as a colour-coded `FeatureCollection` of line features.
///
/// Each feature carries its coordinate, elevation and cumulative-distance
/// slices. `elevations` may be empty when the path has no elevation data.
pub fn render_segments(
    points: &[GpsPoint],
    elevations: &[f64],
    cumulative_distance: &[f64],
    hills: &[Hill],
) -> FeatureCollection {
    let features = plan_segments(points.len(), hills)
        .into_iter()
        .map(|segment| segment_feature(&segment, points, elevations, cumulative_distance))
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn segment_feature(
    segment: &Segment,
    points: &[GpsPoint],
    elevations: &[f64],
    cumulative_distance: &[f64],
) -> Feature {
    let range = segment.start..=segment.end;
    let coordinates: Vec<Vec<f64>> = points[range.clone()]
        .iter()
        .map(|p| p.lng_lat().to_vec())
        .collect();

    let mut properties = JsonObject::new();
    properties.insert("kind".to_string(), json!(segment.kind.as_str()));
    properties.insert("colour".to_string(), json!(segment.kind.colour()));
    properties.insert("startIndex".to_string(), json!(segment.start));
    properties.insert("endIndex".to_string(), json!(segment.end));
    properties.insert(
        "elevations".to_string(),
        json!(elevations.get(range.clone()).unwrap_or(&[])),
    );
    properties.insert(
        "distances".to_string(),
        json!(cumulative_distance.get(range).unwrap_or(&[])),
    );

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::LineString(coordinates))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}
