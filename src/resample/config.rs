//! Resampling configuration

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::Result;
use crate::measure::Measurement;

fn neg_infinity() -> f64 {
    f64::NEG_INFINITY
}

fn infinity() -> f64 {
    f64::INFINITY
}

fn is_unbounded(value: &f64) -> bool {
    value.is_infinite()
}

/// Configuration of one resampling run.
///
/// `min`/`max` bound the subdivision range predicate; leaving them at
/// infinity disables it. They are omitted from JSON when unbounded.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    /// Children per axis of every subdivided node (>= 2)
    pub branch_factor: usize,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Grid vertex counts per axis (>= 2 each); trees number one less
    pub dimensions: [usize; 3],
    /// Primary measurement, written as `<attribute>_measure`
    pub measurement: Option<Measurement>,
    /// Display measurement, written under the attribute's own name
    pub display_measurement: Option<Measurement>,
    /// Lower range bound for the subdivision predicate
    #[serde(default = "neg_infinity", skip_serializing_if = "is_unbounded")]
    pub min: f64,
    /// Upper range bound for the subdivision predicate
    #[serde(default = "infinity", skip_serializing_if = "is_unbounded")]
    pub max: f64,
    /// Subdivide inside (min, max) when true, outside when false
    pub in_range: bool,
    /// Minimum samples a hypothetical child needs to allow subdivision
    pub min_points_per_subtree: i64,
    /// Forbid subdivisions that would hide geometry behind masked leaves
    pub no_empty_cells: bool,
    /// Fill masked leaf values from valid neighbors (point association only)
    pub extrapolate: bool,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            branch_factor: 2,
            max_depth: 1,
            dimensions: [2, 2, 2],
            measurement: None,
            display_measurement: None,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            in_range: true,
            min_points_per_subtree: 1,
            no_empty_cells: false,
            extrapolate: true,
        }
    }
}

impl ResampleConfig {
    /// Check the structural constraints
    pub fn validate(&self) -> Result<()> {
        if self.branch_factor < 2 {
            return Err(crate::core::Error::Config(format!(
                "branch_factor must be at least 2, got {}",
                self.branch_factor
            )));
        }
        for (axis, &dim) in self.dimensions.iter().enumerate() {
            if dim < 2 {
                return Err(crate::core::Error::Config(format!(
                    "dimensions[{axis}] must be at least 2, got {dim}"
                )));
            }
        }
        if self.min_points_per_subtree < 1 {
            return Err(crate::core::Error::Config(format!(
                "min_points_per_subtree must be at least 1, got {}",
                self.min_points_per_subtree
            )));
        }
        Ok(())
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        Ok(config)
    }
}
