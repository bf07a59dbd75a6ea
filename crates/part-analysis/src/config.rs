//! Configuration for part analysis.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use step_kernel::TessellationParams;

use crate::errors::ConfigError;
use crate::materials::{MaterialDensityTable, DEFAULT_MATERIAL};
use crate::metrics::DimensionPolicy;

/// Process-wide analysis settings, read-only once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Tolerances handed to the kernel mesher.
    pub tessellation: TessellationParams,
    /// How bounding-box extents map to length/width/height.
    pub dimension_policy: DimensionPolicy,
    /// Material used when a request names none.
    pub default_material: String,
    /// Extra or replacement densities (kg/m³) keyed by material name.
    pub densities: BTreeMap<String, f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tessellation: TessellationParams::default(),
            dimension_policy: DimensionPolicy::AxisAligned,
            default_material: DEFAULT_MATERIAL.to_string(),
            densities: BTreeMap::new(),
        }
    }
}

impl AnalysisConfig {
    /// Coarse meshing for quick previews.
    pub fn preview() -> Self {
        Self {
            tessellation: TessellationParams {
                linear_deflection: 0.5,
                angular_deflection: 1.0,
            },
            ..Self::default()
        }
    }

    /// Magnitude-sorted dimensions (largest extent reported as length).
    pub fn sorted_dimensions() -> Self {
        Self {
            dimension_policy: DimensionPolicy::SortedDescending,
            ..Self::default()
        }
    }

    /// Parse a JSON config document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Reject non-finite or non-positive densities.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (material, &density) in &self.densities {
            if !density.is_finite() || density <= 0.0 {
                return Err(ConfigError::InvalidDensity {
                    material: material.clone(),
                    density,
                });
            }
        }
        Ok(())
    }

    /// Built-in densities plus the configured overrides.
    pub fn density_table(&self) -> MaterialDensityTable {
        MaterialDensityTable::with_overrides(
            self.densities.iter().map(|(k, &v)| (k.clone(), v)),
        )
    }
}
