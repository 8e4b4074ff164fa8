//! HTTP client for an Open-Elevation compatible lookup service.
//!
//! Points are posted in batches; batches run concurrently but results are
//! reassembled in request order. Failures are reported, never retried; the
//! caller decides whether to try again.

use std::future::Future;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::preflight::ElevationLookup;
use crate::{GpsPoint, PathError, Result};

const DEFAULT_BATCH_SIZE: usize = 200;
const MAX_CONCURRENCY: usize = 4;
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct LookupRequest {
    locations: Vec<Location>,
}

#[derive(Debug, Serialize)]
struct Location {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    results: Vec<LookupResult>,
}

#[derive(Debug, Deserialize)]
struct LookupResult {
    elevation: f64,
}

/// Elevation lookup backed by an HTTP service.
#[derive(Debug, Clone)]
pub struct HttpElevationLookup {
    client: Client,
    endpoint: String,
    batch_size: usize,
}

impl HttpElevationLookup {
    /// Create a lookup posting to `endpoint`
    /// (e.g. `https://api.open-elevation.com/api/v1/lookup`).
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(MAX_CONCURRENCY)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| PathError::lookup_failed_from(format!("failed to create HTTP client: {}", e), e))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Points per request. Default: 200
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    async fn fetch_batch(&self, batch: &[GpsPoint]) -> Result<Vec<f64>> {
        let request = LookupRequest {
            locations: batch
                .iter()
                .map(|p| Location { latitude: p.latitude, longitude: p.longitude })
                .collect(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| PathError::lookup_failed_from(format!("request error: {}", e), e))?
            .error_for_status()
            .map_err(|e| PathError::lookup_failed_from(format!("HTTP {}", e), e))?;

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| PathError::lookup_failed_from(format!("JSON parse error: {}", e), e))?;

        if body.results.len() != batch.len() {
            return Err(PathError::lookup_failed(format!(
                "requested {} elevations, received {}",
                batch.len(),
                body.results.len()
            )));
        }

        Ok(body.results.into_iter().map(|r| r.elevation).collect())
    }
}

impl ElevationLookup for HttpElevationLookup {
    fn lookup(&self, points: &[GpsPoint]) -> impl Future<Output = Result<Vec<f64>>> + Send {
        async move {
            let start = Instant::now();
            let batches: Vec<&[GpsPoint]> = points.chunks(self.batch_size).collect();
            debug!(
                "[ElevationLookup] {} points in {} batches",
                points.len(),
                batches.len()
            );

            let results: Vec<Vec<f64>> = stream::iter(batches)
                .map(|batch| self.fetch_batch(batch))
                .buffered(MAX_CONCURRENCY)
                .try_collect()
                .await?;

            info!(
                "[ElevationLookup] Fetched {} elevations in {:?}",
                points.len(),
                start.elapsed()
            );
            Ok(results.into_iter().flatten().collect())
        }
    }
}
