//! # Elevation Analysis
//!
//! Smooths an elevation profile and derives ascent, descent, lumpiness and hills.
//!
//! ## Trend folding
//!
//! Ascent/descent and hill detection share one sign-tracking fold over the
//! smoothed profile. The fold keeps a running sum of same-signed elevation
//! deltas and the index where that trend began. When a delta of the opposite
//! sign arrives the trend is closed and the new running sum starts *at that
//! delta*, not at zero, so the first step of the new trend is never lost.
//! A zero delta has no sign, so it closes the current trend too; the zero-sum
//! trends a flat stretch leaves behind are discarded.
//!
//! Closed trends are then filtered by magnitude: above `ascent_threshold_m`
//! they count towards ascent/descent, above `hill_threshold_m` they become
//! [`Hill`]s.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::GpsPoint;

/// Configuration for elevation analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevationConfig {
    /// Centered moving-average window (odd). Default: 7
    pub smoothing_period: usize,
    /// Minimum trend magnitude counted as ascent/descent (meters). Default: 5.0
    pub ascent_threshold_m: f64,
    /// Minimum trend magnitude counted as a hill (meters). Default: 30.0
    pub hill_threshold_m: f64,
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            smoothing_period: 7,
            ascent_threshold_m: 5.0,
            hill_threshold_m: 30.0,
        }
    }
}

/// A monotonic elevation excursion between two path indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hill {
    pub start_index: usize,
    pub end_index: usize,
    /// Net elevation change (meters), negative for descents
    pub d_height: f64,
    /// Distance covered (meters)
    pub d_distance: f64,
    /// Steepest single-step gradient magnitude (percent)
    pub max_gradient_pct: f64,
    /// Net gradient over the whole hill (percent)
    pub avg_gradient_pct: f64,
}

impl Hill {
    pub fn is_ascent(&self) -> bool {
        self.avg_gradient_pct > 0.0
    }
}

/// Output of [`analyze_elevation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationAnalysis {
    pub smoothed: Vec<f64>,
    pub ascent: f64,
    /// Sum of committed downhill runs; zero or negative
    pub descent: f64,
    pub max_elev: f64,
    pub min_elev: f64,
    /// Total elevation change per meter travelled
    pub lumpiness: f64,
    pub hills: Vec<Hill>,
}

/// Analyze an elevation profile parallel to `points`.
///
/// Returns `None` when there is no elevation data or it doesn't line up with
/// the points.
pub fn analyze_elevation(
    points: &[GpsPoint],
    elevations: &[f64],
    cumulative_distance: &[f64],
    total_distance: f64,
    config: &ElevationConfig,
) -> Option<ElevationAnalysis> {
    if elevations.is_empty()
        || elevations.len() != points.len()
        || cumulative_distance.len() != points.len()
    {
        return None;
    }

    let smoothed = smooth(elevations, config.smoothing_period);
    let trends = fold_trends(&smoothed);

    let (ascent, descent) = ascent_descent(&trends, config.ascent_threshold_m);
    let hills: Vec<Hill> = trends
        .iter()
        .filter(|t| t.sum.abs() > config.hill_threshold_m)
        .map(|t| hill_stats(t.start, t.end, &smoothed, cumulative_distance))
        .collect();

    let max_elev = smoothed.iter().copied().fold(f64::MIN, f64::max);
    let min_elev = smoothed.iter().copied().fold(f64::MAX, f64::min);
    let lumpiness = if total_distance > 0.0 {
        (ascent + descent.abs()) / total_distance
    } else {
        0.0
    };

    debug!(
        "[Elevation] ascent={:.0}m descent={:.0}m hills={} lumpiness={:.4}",
        ascent,
        descent,
        hills.len(),
        lumpiness
    );

    Some(ElevationAnalysis {
        smoothed,
        ascent,
        descent,
        max_elev,
        min_elev,
        lumpiness,
        hills,
    })
}

/// Centered moving average with a window that shrinks at the boundaries.
///
/// Profiles shorter than two windows are returned unchanged.
pub fn smooth(elevations: &[f64], period: usize) -> Vec<f64> {
    let n = elevations.len();
    if period < 2 || n < 2 * period {
        return elevations.to_vec();
    }

    let half = (period - 1) / 2;
    (0..n)
        .map(|i| {
            let window = &elevations[i.saturating_sub(half)..(i + half + 1).min(n)];
            // Averaging offsets from the first sample keeps constant runs exact
            let base = window[0];
            base + window.iter().map(|e| e - base).sum::<f64>() / window.len() as f64
        })
        .collect()
}

// ============================================================================
// Trend Fold
// ============================================================================

/// A closed run of same-signed elevation deltas spanning `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Trend {
    sum: f64,
    start: usize,
    end: usize,
}

/// Fold state: the running sum and the index of the first delta in the trend.
#[derive(Debug, Clone, Copy)]
struct TrendState {
    running_sum: f64,
    trend_start: usize,
}

impl TrendState {
    fn new() -> Self {
        Self {
            running_sum: 0.0,
            trend_start: 1,
        }
    }

    /// Feed the delta between points `i - 1` and `i`.
    /// Returns the trend that a reversal just closed.
    fn step(&mut self, i: usize, de: f64) -> Option<Trend> {
        if sign(de) == sign(self.running_sum) {
            self.running_sum += de;
            return None;
        }

        let closed = Trend {
            sum: self.running_sum,
            start: self.trend_start - 1,
            end: i - 1,
        };
        self.running_sum = de;
        self.trend_start = i;
        Some(closed)
    }

    fn finish(self, last_index: usize) -> Trend {
        Trend {
            sum: self.running_sum,
            start: self.trend_start - 1,
            end: last_index,
        }
    }
}

fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Split a profile into alternating up/down trends, including the trailing one.
/// Zero-sum trends (flat stretches) are dropped.
fn fold_trends(smoothed: &[f64]) -> Vec<Trend> {
    if smoothed.len() < 2 {
        return Vec::new();
    }

    let mut state = TrendState::new();
    let mut trends = Vec::new();
    for i in 1..smoothed.len() {
        if let Some(trend) = state.step(i, smoothed[i] - smoothed[i - 1]) {
            trends.push(trend);
        }
    }
    trends.push(state.finish(smoothed.len() - 1));

    trends.retain(|t| t.sum != 0.0);
    trends
}

fn ascent_descent(trends: &[Trend], threshold: f64) -> (f64, f64) {
    trends
        .iter()
        .filter(|t| t.sum.abs() > threshold)
        .fold((0.0, 0.0), |(up, down), t| {
            if t.sum > 0.0 {
                (up + t.sum, down)
            } else {
                (up, down + t.sum)
            }
        })
}

fn hill_stats(start: usize, end: usize, smoothed: &[f64], cumulative: &[f64]) -> Hill {
    let d_height = smoothed[end] - smoothed[start];
    let d_distance = cumulative[end] - cumulative[start];

    let max_gradient_pct = (start + 1..=end)
        .filter_map(|i| {
            let dd = cumulative[i] - cumulative[i - 1];
            (dd > 0.0).then(|| ((smoothed[i] - smoothed[i - 1]) / dd * 100.0).abs())
        })
        .fold(0.0, f64::max);

    let avg_gradient_pct = if d_distance > 0.0 {
        d_height / d_distance * 100.0
    } else {
        0.0
    };

    Hill {
        start_index: start,
        end_index: end,
        d_height,
        d_distance,
        max_gradient_pct,
        avg_gradient_pct,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::cumulative_distance;

    /// `n` points heading east, roughly 20m apart.
    fn track(n: usize) -> Vec<GpsPoint> {
        (0..n)
            .map(|i| GpsPoint::new(45.0, 7.0 + i as f64 * 0.000254))
            .collect()
    }

    fn run(elevations: &[f64]) -> ElevationAnalysis {
        let points = track(elevations.len());
        let cumulative = cumulative_distance(&points);
        let total = cumulative[cumulative.len() - 1];
        analyze_elevation(&points, elevations, &cumulative, total, &ElevationConfig::default())
            .unwrap()
    }

    #[test]
    fn test_no_elevation_is_noop() {
        let points = track(20);
        let cumulative = cumulative_distance(&points);
        let result = analyze_elevation(&points, &[], &cumulative, 100.0, &ElevationConfig::default());
        assert!(result.is_none());
    }

    #[test]
    fn test_smoothing_constant_is_identity() {
        let constant = vec![123.4; 50];
        assert_eq!(smooth(&constant, 7), constant);
    }

    #[test]
    fn test_smoothing_short_profile_unchanged() {
        let raw: Vec<f64> = (0..13).map(|i| (i * i) as f64).collect();
        assert_eq!(smooth(&raw, 7), raw);
    }

    #[test]
    fn test_smoothing_shrinks_window_at_edges() {
        let raw: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let smoothed = smooth(&raw, 7);
        assert_eq!(smoothed.len(), raw.len());
        // Window [0, 4) at the start, [16, 20) at the end
        assert!((smoothed[0] - 1.5).abs() < 1e-9);
        assert!((smoothed[19] - 17.5).abs() < 1e-9);
        // Interior of a linear profile is preserved
        assert!((smoothed[10] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_fold_carries_reversal_delta() {
        // Up 10, then down 3, then up 1
        let profile = [0.0, 5.0, 10.0, 7.0, 8.0];
        let trends = fold_trends(&profile);
        assert_eq!(
            trends,
            vec![
                Trend { sum: 10.0, start: 0, end: 2 },
                Trend { sum: -3.0, start: 2, end: 3 },
                Trend { sum: 1.0, start: 3, end: 4 },
            ]
        );
    }

    #[test]
    fn test_fold_zero_delta_splits_trend() {
        let profile = [0.0, 0.0, 4.0, 4.0, 9.0, 2.0];
        let trends = fold_trends(&profile);
        assert_eq!(
            trends,
            vec![
                Trend { sum: 4.0, start: 1, end: 2 },
                Trend { sum: 5.0, start: 3, end: 4 },
                Trend { sum: -7.0, start: 4, end: 5 },
            ]
        );
    }

    #[test]
    fn test_plateau_separates_climbs() {
        // Two 20m climbs with a flat step between them
        let trends = fold_trends(&[0.0, 20.0, 20.0, 40.0]);
        assert_eq!(
            trends,
            vec![
                Trend { sum: 20.0, start: 0, end: 1 },
                Trend { sum: 20.0, start: 2, end: 3 },
            ]
        );
        assert_eq!(ascent_descent(&trends, 30.0), (0.0, 0.0));
        assert_eq!(ascent_descent(&trends, 5.0), (40.0, 0.0));
    }

    #[test]
    fn test_ascent_descent_threshold() {
        let trends = vec![
            Trend { sum: 12.0, start: 0, end: 3 },
            Trend { sum: -4.0, start: 3, end: 5 },
            Trend { sum: 6.0, start: 5, end: 8 },
            Trend { sum: -20.0, start: 8, end: 12 },
        ];
        assert_eq!(ascent_descent(&trends, 5.0), (18.0, -20.0));
    }

    #[test]
    fn test_single_climb_is_one_hill() {
        // 0 -> 200m over 100 steps of ~20m
        let profile: Vec<f64> = (0..=100).map(|i| i as f64 * 2.0).collect();
        let result = run(&profile);

        assert_eq!(result.hills.len(), 1);
        let hill = &result.hills[0];
        assert_eq!(hill.start_index, 0);
        assert_eq!(hill.end_index, 100);
        assert!(hill.is_ascent());
        assert!((hill.avg_gradient_pct - 10.0).abs() < 0.5);
        assert!(hill.max_gradient_pct >= hill.avg_gradient_pct);
        assert!((result.ascent - hill.d_height).abs() < 1e-6);
        assert_eq!(result.descent, 0.0);
    }

    #[test]
    fn test_up_and_down_hills() {
        // 60 points up 1.5m each, then 60 down 1.5m each
        let mut profile: Vec<f64> = (0..60).map(|i| i as f64 * 1.5).collect();
        profile.extend((0..60).map(|i| 87.0 - i as f64 * 1.5));
        let result = run(&profile);

        assert_eq!(result.hills.len(), 2);
        assert!(result.hills[0].d_height > 30.0);
        assert!(result.hills[1].d_height < -30.0);
        assert_eq!(result.hills[0].end_index, result.hills[1].start_index);
        assert!(result.descent < 0.0);
        assert!(result.lumpiness > 0.0);
        for hill in &result.hills {
            assert!(hill.start_index < hill.end_index);
            assert!(hill.d_height.abs() > 30.0);
        }
    }

    #[test]
    fn test_small_bumps_are_not_hills() {
        let profile: Vec<f64> = (0..100).map(|i| if (i / 10) % 2 == 0 { 0.0 } else { 8.0 }).collect();
        let result = run(&profile);
        assert!(result.hills.is_empty());
        assert!(result.max_elev <= 8.0);
        assert!(result.min_elev >= 0.0);
    }

    #[test]
    fn test_summary_stats() {
        let profile: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.3).sin() * 20.0).collect();
        let result = run(&profile);
        assert_eq!(result.smoothed.len(), profile.len());
        assert!(result.max_elev > result.min_elev);
        assert!(result.ascent >= 0.0);
        assert!(result.descent <= 0.0);
    }
}
