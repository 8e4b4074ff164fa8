//! Analyze a GPX file and print a summary.
//!
//! Run with: cargo run --example analyze_route -- path/to/ride.gpx

use std::{env, fs, process};

use path_analyzer::{parse_gpx, AnalysisConfig};

fn main() {
    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: analyze_route <file.gpx>");
        process::exit(2);
    };

    let text = match fs::read_to_string(&path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("cannot read {}: {}", path, e);
            process::exit(1);
        }
    };

    let raw = match parse_gpx(&text) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let config = AnalysisConfig::default();
    let analyzed = match raw.analyze(&config) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    println!("{} ({:?}, {} raw points)\n", raw.name, raw.kind, raw.points.len());
    println!("Simplified points: {}", analyzed.points.len());
    println!("Distance:          {:.2} km", analyzed.distance_stats.total_distance / 1000.0);
    println!("Shape:             {}", analyzed.category);
    println!("Direction:         {}", analyzed.direction);
    println!("Rotation score:    {:.2}", analyzed.rotation_score);
    println!("Shared points:     {:.1}%", analyzed.pct_shared());

    match &analyzed.elevation_stats {
        Some(stats) => {
            println!("Ascent / descent:  {:.0} m / {:.0} m", stats.ascent, stats.descent);
            println!("Elevation range:   {:.0} m to {:.0} m", stats.min_elev, stats.max_elev);
            println!("Lumpiness:         {:.1} m/km", stats.lumpiness * 1000.0);
            println!("\nHills:");
            for hill in &analyzed.hills {
                println!(
                    "  {:>5} -> {:<5} {:>+6.0} m over {:>6.0} m  avg {:>+5.1}%  max {:>5.1}%",
                    hill.start_index,
                    hill.end_index,
                    hill.d_height,
                    hill.d_distance,
                    hill.avg_gradient_pct,
                    hill.max_gradient_pct
                );
            }
        }
        None => println!("No elevation data"),
    }

    let segments = analyzed.render_segments();
    println!("\nRendered {} map segments", segments.features.len());
}
