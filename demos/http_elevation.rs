//! Backfill elevation from an Open-Elevation compatible service.
//!
//! Run with: cargo run --example http_elevation --features http -- [endpoint]

use std::env;

use path_analyzer::{AnalysisConfig, GpsPoint, HttpElevationLookup, PathAnalyzer};

const DEFAULT_ENDPOINT: &str = "https://api.open-elevation.com/api/v1/lookup";

#[tokio::main]
async fn main() {
    let endpoint = env::args().nth(1).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

    // Up the Col de la Madeleine, roughly
    let points: Vec<GpsPoint> = (0..120)
        .map(|i| GpsPoint::new(45.35 + i as f64 * 0.0008, 6.30 + i as f64 * 0.0004))
        .collect();

    let lookup = match HttpElevationLookup::new(&endpoint) {
        Ok(l) => l.with_batch_size(100),
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };
    let analyzer = PathAnalyzer::new(AnalysisConfig::default(), lookup);

    match analyzer.analyze(&points, None).await {
        Ok(path) => {
            println!("{} points, {:.1} km", path.points.len(), path.distance_stats.total_distance / 1000.0);
            match path.elevation_stats {
                Some(stats) => println!(
                    "Ascent {:.0} m, descent {:.0} m, {} hills",
                    stats.ascent,
                    stats.descent,
                    path.hills.len()
                ),
                None => println!("Service returned no elevation"),
            }
        }
        Err(e) => eprintln!("Analysis failed: {}", e),
    }
}
