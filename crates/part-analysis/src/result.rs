//! The analysis result and its emitted (rounded) record.

use base64::Engine as _;
use serde::Serialize;

use crate::export::MeshFormat;
use crate::metrics::{BoundingBox, Dimensions, PartMetrics};

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Where an exported mesh ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshDelivery {
    /// The bytes travel inside the result.
    Embedded(Vec<u8>),
    /// The bytes were persisted under an opaque name.
    Reference(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshPayload {
    pub format: MeshFormat,
    pub delivery: MeshDelivery,
    pub vertex_count: usize,
    pub triangle_count: usize,
}

/// Non-fatal conditions met during analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Warnings {
    pub faces_skipped: usize,
    pub unknown_material: bool,
}

/// Everything one analysis produced, at full precision.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub file_name: String,
    pub material: String,
    pub metrics: PartMetrics,
    pub mesh: Option<MeshPayload>,
    /// Why the requested mesh is missing, if it is.
    pub mesh_error: Option<String>,
    pub warnings: Warnings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshRecord {
    pub format: MeshFormat,
    pub encoding: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// The emitted record. Metric values are rounded here and only here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub material: String,
    #[serde(rename = "rawBoundingBox")]
    pub raw_bounding_box: BoundingBox,
    pub dimensions_mm: Dimensions,
    pub volume_mm3: f64,
    pub volume_m3: f64,
    pub weight_kg: f64,
    pub approximate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh: Option<MeshRecord>,
    #[serde(rename = "meshError", skip_serializing_if = "Option::is_none")]
    pub mesh_error: Option<String>,
    pub warnings: Warnings,
}

impl AnalysisResult {
    pub fn to_record(&self) -> AnalysisRecord {
        let d = &self.metrics.dimensions;
        let v = &self.metrics.volume;
        AnalysisRecord {
            file_name: self.file_name.clone(),
            material: self.material.clone(),
            raw_bounding_box: self.metrics.bounding_box,
            dimensions_mm: Dimensions {
                length: round_to(d.length, 3),
                width: round_to(d.width, 3),
                height: round_to(d.height, 3),
            },
            volume_mm3: round_to(v.volume_mm3, 3),
            volume_m3: round_to(v.volume_m3, 9),
            weight_kg: round_to(v.weight_kg, 4),
            approximate: v.approximate,
            mesh: self.mesh.as_ref().map(MeshRecord::from_payload),
            mesh_error: self.mesh_error.clone(),
            warnings: self.warnings,
        }
    }
}

impl MeshRecord {
    fn from_payload(payload: &MeshPayload) -> Self {
        match &payload.delivery {
            MeshDelivery::Embedded(bytes) => MeshRecord {
                format: payload.format,
                encoding: "base64",
                data: Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
                reference: None,
            },
            MeshDelivery::Reference(name) => MeshRecord {
                format: payload.format,
                encoding: "reference",
                data: None,
                reference: Some(name.clone()),
            },
        }
    }
}
