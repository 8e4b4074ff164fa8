//! Analysis configuration.
//!
//! Every threshold used by the pipeline lives in one of the per-stage config
//! structs; [`AnalysisConfig`] bundles them. All of them deserialize with
//! `#[serde(default)]`, so a JSON document only needs the fields it overrides:
//!
//! ```rust
//! use path_analyzer::AnalysisConfig;
//!
//! let config = AnalysisConfig::from_json_str(r#"{ "shape": { "match_distance_m": 50.0 } }"#).unwrap();
//! assert_eq!(config.shape.match_distance_m, 50.0);
//! assert_eq!(config.shape.match_buffer, 10);
//! ```

use serde::{Deserialize, Serialize};

use crate::{ElevationConfig, PreflightConfig, Result, ShapeConfig};

/// Configuration for a full path analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub preflight: PreflightConfig,
    pub shape: ShapeConfig,
    pub elevation: ElevationConfig,
}

impl AnalysisConfig {
    /// Parse a (possibly partial) JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the algorithms cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.elevation.smoothing_period == 0 || self.elevation.smoothing_period % 2 == 0 {
            return Err(crate::PathError::invalid_input(format!(
                "smoothing_period must be odd, got {}",
                self.elevation.smoothing_period
            )));
        }
        if self.shape.bearing_sections == 0 {
            return Err(crate::PathError::invalid_input("bearing_sections must be positive"));
        }
        if self.shape.match_distance_m <= 0.0 {
            return Err(crate::PathError::invalid_input("match_distance_m must be positive"));
        }
        if self.preflight.aggressive_tolerance_m < self.preflight.mild_tolerance_m {
            return Err(crate::PathError::invalid_input(
                "aggressive_tolerance_m must not be smaller than mild_tolerance_m",
            ));
        }
        Ok(())
    }
}
