//! Solver and problem configuration
//!
//! Both structures can be embedded in a JSON run file:
//!
//! ```json
//! {
//!   "problem": { "tiles": 4, "tile_size": 32, "seed": 7 },
//!   "solver": { "threads": 8, "sync": "dataflow" }
//! }
//! ```
//!
//! Omitted fields take their default value.

use crate::error::{Result, TiledLuError};
use crate::kernels::DEFAULT_PIVOT_TOLERANCE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// When the factorization waits for submitted operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPolicy {
    /// Wait after every diagonal factorization before submitting the
    /// panel solves and trailing updates of that level
    #[default]
    Barrier,
    /// Submit the whole factorization and substitution, wait once
    Dataflow,
}

/// Solver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TiledLuConfig {
    /// Worker threads (0 = one per core)
    pub threads: usize,
    /// Synchronization policy between factorization levels
    pub sync: SyncPolicy,
    /// Pivot magnitude below which a diagonal tile is singular
    pub pivot_tolerance: f64,
}

impl Default for TiledLuConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            sync: SyncPolicy::Barrier,
            pivot_tolerance: DEFAULT_PIVOT_TOLERANCE,
        }
    }
}

impl TiledLuConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.pivot_tolerance >= 0.0) {
            return Err(TiledLuError::Config(format!(
                "pivot tolerance must be non-negative, got {}",
                self.pivot_tolerance
            )));
        }
        Ok(())
    }
}

/// Synthetic problem dimensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemConfig {
    /// Tiles per grid dimension (M)
    pub tiles: usize,
    /// Order of each tile (N)
    pub tile_size: usize,
    /// Seed of the random generator
    pub seed: u64,
}

impl Default for ProblemConfig {
    fn default() -> Self {
        Self {
            tiles: 3,
            tile_size: 16,
            seed: 42,
        }
    }
}

impl ProblemConfig {
    pub fn validate(&self) -> Result<()> {
        crate::tile::validate_grid(self.tiles, self.tile_size)
    }
}

/// Complete run description as stored in a JSON file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub problem: ProblemConfig,
    #[serde(default)]
    pub solver: TiledLuConfig,
}

impl RunConfig {
    /// Load a run configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| {
            TiledLuError::Config(format!(
                "failed to read {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_json(&contents)
    }

    /// Parse a run configuration from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let config: RunConfig = serde_json::from_str(json)
            .map_err(|e| TiledLuError::Config(format!("failed to parse JSON: {e}")))?;
        config.problem.validate()?;
        config.solver.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TiledLuError::Config(format!("failed to serialize: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = RunConfig::from_json(r#"{ "solver": { "sync": "dataflow" } }"#).unwrap();
        assert_eq!(config.solver.sync, SyncPolicy::Dataflow);
        assert_eq!(config.solver.threads, 0);
        assert_eq!(config.problem, ProblemConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let config = RunConfig {
            problem: ProblemConfig {
                tiles: 5,
                tile_size: 8,
                seed: 11,
            },
            solver: TiledLuConfig {
                threads: 2,
                sync: SyncPolicy::Dataflow,
                pivot_tolerance: 1e-20,
            },
        };
        let json = config.to_json().unwrap();
        assert_eq!(RunConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_rejects_zero_tiles() {
        let err = RunConfig::from_json(r#"{ "problem": { "tiles": 0 } }"#).unwrap_err();
        assert!(err.is_dimension_error());
    }

    #[test]
    fn test_rejects_overflowing_grid() {
        let err = RunConfig::from_json(r#"{ "problem": { "tiles": 4294967296, "tile_size": 1 } }"#)
            .unwrap_err();
        assert!(err.is_dimension_error());
    }

    #[test]
    fn test_rejects_garbage() {
        let err = RunConfig::from_json("not json").unwrap_err();
        assert!(matches!(err, TiledLuError::Config(_)));
        assert!(RunConfig::from_file("/nonexistent/run.json").is_err());
    }
}
