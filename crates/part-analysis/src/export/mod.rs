//! Serialization of an assembled [`MeshBuffer`] into visualization formats.
//!
//! Exporters only produce bytes; persisting or embedding them is up to the caller.

pub mod glb;
pub mod stl;

use serde::{Deserialize, Serialize};

use crate::errors::ExportError;
use crate::mesh::MeshBuffer;

pub use glb::to_glb;
pub use stl::{to_ascii_stl, to_binary_stl};

/// Mesh export target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshFormat {
    /// Binary STL.
    Stl,
    /// ASCII STL, stored with the same `.stl` extension.
    #[serde(rename = "stl-ascii")]
    StlAscii,
    Glb,
}

impl MeshFormat {
    /// Name used in requests, records and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            MeshFormat::Stl => "stl",
            MeshFormat::StlAscii => "stl-ascii",
            MeshFormat::Glb => "glb",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            MeshFormat::Stl | MeshFormat::StlAscii => "stl",
            MeshFormat::Glb => "glb",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            MeshFormat::Stl | MeshFormat::StlAscii => "model/stl",
            MeshFormat::Glb => "model/gltf-binary",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "stl" => Some(MeshFormat::Stl),
            "glb" => Some(MeshFormat::Glb),
            _ => None,
        }
    }
}

impl std::fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for MeshFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stl-ascii" => Ok(MeshFormat::StlAscii),
            other => {
                Self::from_extension(other).ok_or_else(|| format!("unknown mesh format: {s}"))
            }
        }
    }
}

/// Check that every triangle index addresses an existing vertex.
pub fn validate_indices(mesh: &MeshBuffer) -> Result<(), ExportError> {
    let vertex_count = mesh.vertex_count();
    match mesh.faces.iter().flatten().find(|&&i| i as usize >= vertex_count) {
        Some(&index) => Err(ExportError::IndexOutOfRange {
            index,
            vertex_count,
        }),
        None => Ok(()),
    }
}

/// Serialize `mesh` in `format`. `name` ends up in the STL header.
pub fn export(mesh: &MeshBuffer, format: MeshFormat, name: &str) -> Result<Vec<u8>, ExportError> {
    match format {
        MeshFormat::Stl => to_binary_stl(mesh, name),
        MeshFormat::StlAscii => to_ascii_stl(mesh, name).map(String::into_bytes),
        MeshFormat::Glb => to_glb(mesh),
    }
}

/// Face normal of the triangle (a, b, c): the normalized cross product of
/// (b - a) and (c - a), or zero when the triangle is degenerate.
pub(crate) fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let nx = e1[1] * e2[2] - e1[2] * e2[1];
    let ny = e1[2] * e2[0] - e1[0] * e2[2];
    let nz = e1[0] * e2[1] - e1[1] * e2[0];
    let len = (nx * nx + ny * ny + nz * nz).sqrt();
    if len > 1e-12 {
        [nx / len, ny / len, nz / len]
    } else {
        [0.0, 0.0, 0.0]
    }
}

pub(crate) fn to_f32(v: [f64; 3]) -> [f32; 3] {
    [v[0] as f32, v[1] as f32, v[2] as f32]
}
