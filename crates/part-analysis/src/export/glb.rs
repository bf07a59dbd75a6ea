//! Binary glTF 2.0 (GLB) export.
//!
//! One buffer holds positions (f32 VEC3) followed by indices (u32 SCALAR).
//! The container is:
//! - 12 bytes: magic `glTF`, version 2, total length (u32 LE each)
//! - JSON chunk: length, type `JSON`, scene description padded with spaces
//! - BIN chunk: length, type `BIN\0`, buffer padded with zeros
//!
//! Chunk lengths are multiples of 4.

use serde_json::json;

use super::{to_f32, validate_indices};
use crate::errors::ExportError;
use crate::mesh::MeshBuffer;

pub const GLB_MAGIC: u32 = 0x4654_6C67;
pub const GLB_VERSION: u32 = 2;
pub const CHUNK_JSON: u32 = 0x4E4F_534A;
pub const CHUNK_BIN: u32 = 0x004E_4942;

const COMPONENT_FLOAT: u32 = 5126;
const COMPONENT_UNSIGNED_INT: u32 = 5125;
const TARGET_ARRAY_BUFFER: u32 = 34962;
const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;
const MODE_TRIANGLES: u32 = 4;

fn too_large(reason: String) -> ExportError {
    ExportError::TooLarge {
        format: "glb",
        reason,
    }
}

fn pad_to_four(buf: &mut Vec<u8>, fill: u8) {
    while buf.len() % 4 != 0 {
        buf.push(fill);
    }
}

fn chunk_len(len: usize) -> Result<u32, ExportError> {
    u32::try_from(len).map_err(|_| too_large(format!("chunk of {len} bytes")))
}

/// Export as a single-mesh GLB file.
pub fn to_glb(mesh: &MeshBuffer) -> Result<Vec<u8>, ExportError> {
    validate_indices(mesh)?;

    let vertex_count = mesh.vertex_count();
    let index_count = mesh.face_count() * 3;
    let positions_len = vertex_count * 12;
    let indices_len = index_count * 4;

    let mut bin = Vec::with_capacity(positions_len + indices_len);
    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];
    for &v in &mesh.vertices {
        let p = to_f32(v);
        for i in 0..3 {
            min[i] = min[i].min(p[i]);
            max[i] = max[i].max(p[i]);
            bin.extend_from_slice(&p[i].to_le_bytes());
        }
    }
    for &i in mesh.faces.iter().flatten() {
        bin.extend_from_slice(&i.to_le_bytes());
    }
    // Positions are 12-byte aligned and indices 4-byte, so no inner padding.
    pad_to_four(&mut bin, 0);

    let mut position_accessor = json!({
        "bufferView": 0,
        "componentType": COMPONENT_FLOAT,
        "count": vertex_count,
        "type": "VEC3",
    });
    // glTF requires min/max on POSITION; an empty mesh has none to give.
    if vertex_count > 0 {
        position_accessor["min"] = json!(min);
        position_accessor["max"] = json!(max);
    }

    let document = json!({
        "asset": { "version": "2.0", "generator": "part-analysis" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{
            "primitives": [{
                "attributes": { "POSITION": 0 },
                "indices": 1,
                "mode": MODE_TRIANGLES,
            }]
        }],
        "buffers": [{ "byteLength": bin.len() }],
        "bufferViews": [
            {
                "buffer": 0,
                "byteOffset": 0,
                "byteLength": positions_len,
                "byteStride": 12,
                "target": TARGET_ARRAY_BUFFER,
            },
            {
                "buffer": 0,
                "byteOffset": positions_len,
                "byteLength": indices_len,
                "target": TARGET_ELEMENT_ARRAY_BUFFER,
            }
        ],
        "accessors": [
            position_accessor,
            {
                "bufferView": 1,
                "componentType": COMPONENT_UNSIGNED_INT,
                "count": index_count,
                "type": "SCALAR",
            }
        ],
    });

    let mut json_bytes = serde_json::to_vec(&document)
        .map_err(|e| too_large(format!("scene description: {e}")))?;
    pad_to_four(&mut json_bytes, b' ');

    let total_len = 12 + 8 + json_bytes.len() + 8 + bin.len();
    let total = chunk_len(total_len)?;

    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&total.to_le_bytes());

    out.extend_from_slice(&chunk_len(json_bytes.len())?.to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json_bytes);

    out.extend_from_slice(&chunk_len(bin.len())?.to_le_bytes());
    out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    out.extend_from_slice(&bin);

    Ok(out)
}
