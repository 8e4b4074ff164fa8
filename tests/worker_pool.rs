//! The process-wide worker pool.
//!
//! Kept to a single test so the one-pool-per-process guard is exercised
//! deterministically in this test binary.

use futures::future::join_all;
use path_analyzer::{analyze_offline, AnalysisConfig, GpsPoint, PathError, PoolConfig, WorkerPool};

fn wiggly_path(seed: usize) -> (Vec<GpsPoint>, Vec<Option<f64>>) {
    let n = 150 + seed * 7;
    let points = (0..n)
        .map(|i| {
            let t = i as f64;
            GpsPoint::new(
                45.0 + t * 0.0002,
                7.0 + (t * 0.05 + seed as f64).sin() * 0.002,
            )
        })
        .collect();
    let elevations = (0..n)
        .map(|i| Some(400.0 + (i as f64 * 0.03 + seed as f64).cos() * 50.0))
        .collect();
    (points, elevations)
}

#[tokio::test]
async fn test_pool_lifecycle_and_concurrent_analysis() {
    let pool = WorkerPool::create(PoolConfig::default()).unwrap();
    assert!(pool.size() >= 1);

    // Second creation is refused
    assert_eq!(
        WorkerPool::create(PoolConfig::default()).err(),
        Some(PathError::PoolAlreadyCreated)
    );

    let config = AnalysisConfig::default();
    let inputs: Vec<_> = (0..50).map(wiggly_path).collect();

    let pending: Vec<_> = inputs
        .iter()
        .map(|(points, elevations)| {
            pool.analyze(points.clone(), Some(elevations.clone()), config.clone())
        })
        .collect();
    let results = join_all(pending).await;

    assert_eq!(results.len(), 50);
    for ((points, elevations), result) in inputs.iter().zip(results) {
        let pooled = result.unwrap();
        let sequential = analyze_offline(points, Some(elevations), &config).unwrap();
        assert_eq!(pooled, sequential);
    }
}
