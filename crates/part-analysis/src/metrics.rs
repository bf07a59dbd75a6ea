//! Physical metrics of a loaded shape: bounding box, dimensions, volume, weight.
//!
//! Everything here works at full precision. Rounding happens only when the
//! result record is emitted (see [`crate::result`]).

use serde::{Deserialize, Serialize};
use step_kernel::{GeometryKernel, RawBounds, ShapeHandle};
use tracing::{debug, instrument, warn};

use crate::errors::AnalysisError;
use crate::materials::{Density, MaterialDensityTable};

/// Cubic millimetres per cubic metre.
pub const MM3_PER_M3: f64 = 1_000_000_000.0;

/// Axis-aligned bounding box in millimetres. Always `min <= max` per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub zmin: f64,
    pub zmax: f64,
}

impl BoundingBox {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Result<Self, AnalysisError> {
        for axis in 0..3 {
            if !min[axis].is_finite() || !max[axis].is_finite() {
                return Err(AnalysisError::Geometry {
                    reason: format!("non-finite bounding box {min:?}..{max:?}"),
                });
            }
            if min[axis] > max[axis] {
                return Err(AnalysisError::Geometry {
                    reason: format!("inverted bounding box on axis {axis}: {min:?}..{max:?}"),
                });
            }
        }
        Ok(Self {
            xmin: min[0],
            xmax: max[0],
            ymin: min[1],
            ymax: max[1],
            zmin: min[2],
            zmax: max[2],
        })
    }

    pub fn from_raw(raw: RawBounds) -> Result<Self, AnalysisError> {
        Self::new(raw.min, raw.max)
    }

    /// Extents along x, y and z.
    pub fn extents(&self) -> [f64; 3] {
        [
            self.xmax - self.xmin,
            self.ymax - self.ymin,
            self.zmax - self.zmin,
        ]
    }
}

/// How bounding-box extents are mapped to length/width/height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionPolicy {
    /// x → length, y → width, z → height.
    #[default]
    AxisAligned,
    /// Largest extent → length, then width, then height, regardless of axis.
    SortedDescending,
}

/// Part dimensions in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

/// Volume and whether it is only the bounding-box product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeEstimate {
    pub volume_mm3: f64,
    pub approximate: bool,
}

/// Mass derived from a volume and a material density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightEstimate {
    pub volume_m3: f64,
    pub weight_kg: f64,
    pub density: Density,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeMetrics {
    pub volume_mm3: f64,
    pub volume_m3: f64,
    pub weight_kg: f64,
    pub approximate: bool,
}

/// All metrics of one part, unrounded.
#[derive(Debug, Clone, PartialEq)]
pub struct PartMetrics {
    pub bounding_box: BoundingBox,
    pub dimensions: Dimensions,
    pub volume: VolumeMetrics,
    pub density: Density,
}

/// Bounding box of `shape` from the kernel's accumulation.
#[instrument(skip_all)]
pub fn compute_bounding_box<K: GeometryKernel>(
    kernel: &K,
    shape: &ShapeHandle,
) -> Result<BoundingBox, AnalysisError> {
    let raw = kernel
        .bounding_box(shape)
        .map_err(|e| AnalysisError::Geometry {
            reason: e.to_string(),
        })?;
    let bbox = BoundingBox::from_raw(raw)?;
    debug!(?bbox, "bounding box");
    Ok(bbox)
}

pub fn compute_dimensions(bbox: &BoundingBox, policy: DimensionPolicy) -> Dimensions {
    let [dx, dy, dz] = bbox.extents();
    match policy {
        DimensionPolicy::AxisAligned => Dimensions {
            length: dx,
            width: dy,
            height: dz,
        },
        DimensionPolicy::SortedDescending => {
            let mut e = [dx, dy, dz];
            e.sort_by(|a, b| b.total_cmp(a));
            Dimensions {
                length: e[0],
                width: e[1],
                height: e[2],
            }
        }
    }
}

/// Exact kernel volume when available, else the bounding-box product flagged
/// as approximate.
#[instrument(skip_all)]
pub fn compute_volume<K: GeometryKernel>(
    kernel: &K,
    shape: &ShapeHandle,
    bbox: &BoundingBox,
) -> Result<VolumeEstimate, AnalysisError> {
    let integrated = kernel.volume(shape).map_err(|e| AnalysisError::Geometry {
        reason: e.to_string(),
    })?;

    match integrated {
        Some(v) if v.is_finite() => Ok(VolumeEstimate {
            volume_mm3: v.abs(),
            approximate: false,
        }),
        Some(v) => Err(AnalysisError::Geometry {
            reason: format!("kernel reported volume {v}"),
        }),
        None => {
            let [dx, dy, dz] = bbox.extents();
            warn!("kernel has no volume integration, using bounding-box product");
            Ok(VolumeEstimate {
                volume_mm3: dx * dy * dz,
                approximate: true,
            })
        }
    }
}

pub fn compute_weight(
    volume_mm3: f64,
    material: &str,
    densities: &MaterialDensityTable,
) -> WeightEstimate {
    let density = densities.lookup(material);
    let volume_m3 = volume_mm3 / MM3_PER_M3;
    WeightEstimate {
        volume_m3,
        weight_kg: volume_m3 * density.value,
        density,
    }
}

/// Runs the metric computations in order against one shape.
pub struct MetricsExtractor<'a> {
    densities: &'a MaterialDensityTable,
    policy: DimensionPolicy,
}

impl<'a> MetricsExtractor<'a> {
    pub fn new(densities: &'a MaterialDensityTable, policy: DimensionPolicy) -> Self {
        Self { densities, policy }
    }

    pub fn extract<K: GeometryKernel>(
        &self,
        kernel: &K,
        shape: &ShapeHandle,
        material: &str,
    ) -> Result<PartMetrics, AnalysisError> {
        let bounding_box = compute_bounding_box(kernel, shape)?;
        let dimensions = compute_dimensions(&bounding_box, self.policy);
        let volume = compute_volume(kernel, shape, &bounding_box)?;
        let weight = compute_weight(volume.volume_mm3, material, self.densities);
        if weight.density.fallback {
            warn!(material, "unknown material, using steel density");
        }

        Ok(PartMetrics {
            bounding_box,
            dimensions,
            volume: VolumeMetrics {
                volume_mm3: volume.volume_mm3,
                volume_m3: weight.volume_m3,
                weight_kg: weight.weight_kg,
                approximate: volume.approximate,
            },
            density: weight.density,
        })
    }
}
