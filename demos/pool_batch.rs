//! Analyze a batch of synthetic paths on the worker pool.
//!
//! Run with: cargo run --release --example pool_batch

use std::time::Instant;

use futures::future::join_all;
use path_analyzer::{AnalysisConfig, GpsPoint, PoolConfig, WorkerPool};

const PATHS: usize = 200;

fn synthetic_path(seed: usize) -> (Vec<GpsPoint>, Vec<Option<f64>>) {
    let n = 500 + (seed % 7) * 300;
    let radius = 0.01 + (seed % 5) as f64 * 0.004;
    let points = (0..n)
        .map(|i| {
            let t = i as f64 / n as f64 * std::f64::consts::TAU;
            GpsPoint::new(46.5 + radius * t.cos(), 7.5 + radius * 1.4 * t.sin())
        })
        .collect();
    let elevations = (0..n)
        .map(|i| Some(800.0 + (i as f64 * 0.02 + seed as f64).sin() * 120.0))
        .collect();
    (points, elevations)
}

#[tokio::main]
async fn main() {
    let pool = match WorkerPool::create(PoolConfig::default()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };
    println!("Worker pool with {} threads", pool.size());

    let config = AnalysisConfig::default();
    let start = Instant::now();
    let pending: Vec<_> = (0..PATHS)
        .map(|seed| {
            let (points, elevations) = synthetic_path(seed);
            pool.analyze(points, Some(elevations), config.clone())
        })
        .collect();
    let results = join_all(pending).await;
    let elapsed = start.elapsed();

    for (seed, result) in results.iter().enumerate().take(5) {
        match result {
            Ok(path) => println!(
                "  path {:>3}: {} {}, {} hills",
                seed,
                path.category,
                path.direction,
                path.hills.len()
            ),
            Err(e) => println!("  path {:>3}: {}", seed, e),
        }
    }
    let failed = results.iter().filter(|r| r.is_err()).count();

    println!(
        "\nAnalyzed {} paths in {:?} ({:.1} ms/path), {} failed",
        PATHS,
        elapsed,
        elapsed.as_secs_f64() * 1000.0 / PATHS as f64,
        failed
    );
}
