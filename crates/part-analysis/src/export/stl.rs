//! Binary and ASCII STL export.

use std::fmt::Write as _;

use super::{face_normal, to_f32, validate_indices};
use crate::errors::ExportError;
use crate::mesh::MeshBuffer;

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;

/// The three corner positions of every triangle, in f32, in buffer order.
fn triangle_soup(mesh: &MeshBuffer) -> impl Iterator<Item = [[f32; 3]; 3]> + '_ {
    mesh.faces.iter().map(|f| {
        [
            to_f32(mesh.vertices[f[0] as usize]),
            to_f32(mesh.vertices[f[1] as usize]),
            to_f32(mesh.vertices[f[2] as usize]),
        ]
    })
}

/// Export as binary STL.
///
/// Layout:
/// - 80 bytes: header (`name`, zero-padded)
/// - 4 bytes: u32 LE triangle count
/// - Per triangle (50 bytes each):
///   - 12 bytes: normal vector (3 × f32 LE)
///   - 36 bytes: 3 vertices (3 × 3 × f32 LE)
///   - 2 bytes: attribute byte count (0u16)
pub fn to_binary_stl(mesh: &MeshBuffer, name: &str) -> Result<Vec<u8>, ExportError> {
    validate_indices(mesh)?;
    let tri_count = u32::try_from(mesh.face_count()).map_err(|_| ExportError::TooLarge {
        format: "stl",
        reason: format!("{} triangles", mesh.face_count()),
    })?;

    let mut buf = Vec::with_capacity(HEADER_LEN + 4 + mesh.face_count() * TRIANGLE_LEN);

    let header = format!("binary STL: {name}");
    let header_bytes = header.as_bytes();
    buf.extend_from_slice(&header_bytes[..header_bytes.len().min(HEADER_LEN)]);
    buf.resize(HEADER_LEN, 0u8);

    buf.extend_from_slice(&tri_count.to_le_bytes());

    for [v0, v1, v2] in triangle_soup(mesh) {
        for c in face_normal(v0, v1, v2) {
            buf.extend_from_slice(&c.to_le_bytes());
        }
        for v in [v0, v1, v2] {
            for c in v {
                buf.extend_from_slice(&c.to_le_bytes());
            }
        }
        buf.extend_from_slice(&0u16.to_le_bytes());
    }

    Ok(buf)
}

/// Export as ASCII STL.
pub fn to_ascii_stl(mesh: &MeshBuffer, name: &str) -> Result<String, ExportError> {
    validate_indices(mesh)?;

    let mut out = String::with_capacity(mesh.face_count() * 256);
    let _ = writeln!(out, "solid {name}");
    for [v0, v1, v2] in triangle_soup(mesh) {
        let [nx, ny, nz] = face_normal(v0, v1, v2);
        let _ = writeln!(out, "  facet normal {nx:e} {ny:e} {nz:e}");
        out.push_str("    outer loop\n");
        for [x, y, z] in [v0, v1, v2] {
            let _ = writeln!(out, "      vertex {x:e} {y:e} {z:e}");
        }
        out.push_str("    endloop\n");
        out.push_str("  endfacet\n");
    }
    let _ = writeln!(out, "endsolid {name}");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_f32(buf: &[u8], at: usize) -> f32 {
        f32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
    }

    fn quad() -> MeshBuffer {
        MeshBuffer {
            vertices: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            faces: vec![[0, 1, 2], [0, 2, 3]],
        }
    }

    #[test]
    fn size_is_header_plus_fifty_per_triangle() {
        let stl = to_binary_stl(&quad(), "quad").unwrap();
        assert_eq!(stl.len(), 84 + 2 * 50);
        assert_eq!(u32::from_le_bytes([stl[80], stl[81], stl[82], stl[83]]), 2);
        assert!(String::from_utf8_lossy(&stl[..80]).contains("quad"));
    }

    #[test]
    fn normal_follows_winding() {
        let stl = to_binary_stl(&quad(), "quad").unwrap();
        // (1,0,0) × (1,1,0) = +z
        assert_eq!(read_f32(&stl, 84), 0.0);
        assert_eq!(read_f32(&stl, 88), 0.0);
        assert!((read_f32(&stl, 92) - 1.0).abs() < 1e-6);
        // first corner of first triangle follows the normal
        assert_eq!(read_f32(&stl, 96), 0.0);
    }

    #[test]
    fn degenerate_triangle_gets_zero_normal() {
        let mesh = MeshBuffer {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
            faces: vec![[0, 1, 2]],
        };
        let stl = to_binary_stl(&mesh, "line").unwrap();
        for at in [84, 88, 92] {
            assert_eq!(read_f32(&stl, at), 0.0);
        }
    }

    #[test]
    fn long_name_is_truncated_to_header() {
        let name = "x".repeat(200);
        let stl = to_binary_stl(&quad(), &name).unwrap();
        assert_eq!(stl.len(), 84 + 2 * 50);
    }

    #[test]
    fn bad_index_is_rejected() {
        let mut mesh = quad();
        mesh.faces.push([0, 1, 9]);
        assert!(matches!(
            to_binary_stl(&mesh, "bad"),
            Err(ExportError::IndexOutOfRange { index: 9, .. })
        ));
        assert!(to_ascii_stl(&mesh, "bad").is_err());
    }

    #[test]
    fn ascii_has_facets() {
        let stl = to_ascii_stl(&quad(), "quad").unwrap();
        assert!(stl.starts_with("solid quad\n"));
        assert!(stl.ends_with("endsolid quad\n"));
        assert_eq!(stl.matches("facet normal").count(), 2);
        assert_eq!(stl.matches("vertex").count(), 6);
        assert_eq!(stl.matches("endloop").count(), 2);
    }
}
