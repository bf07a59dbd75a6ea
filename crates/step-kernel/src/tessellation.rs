//! Per-face triangulation of STEP shells.
//!
//! Wraps truck-meshalgo so that each B-rep face yields its own
//! [`Triangulation`], or `None` when the mesher produced nothing for it.

use truck_meshalgo::prelude::*;
use truck_meshalgo::tessellation::MeshableShape;
use truck_stepio::r#in::Table;

use crate::types::*;

/// Triangulate one shell of a STEP table, face by face, in shell order.
pub fn triangulate_shell(
    table: &Table,
    shell_id: u64,
    tolerance: f64,
    next_id: &mut u64,
) -> Result<Vec<KernelFace>, KernelError> {
    let holder = table
        .shell
        .get(&shell_id)
        .ok_or(KernelError::ShapeNotFound { id: shell_id })?;
    let shell = table
        .to_compressed_shell(holder)
        .map_err(|e| KernelError::ConversionFailed {
            reason: format!("shell #{shell_id}: {e}"),
        })?;

    let meshed = shell.triangulation(tolerance);

    let mut faces = Vec::with_capacity(meshed.faces.len());
    for face in &meshed.faces {
        let id = KernelId(*next_id);
        *next_id += 1;

        let triangulation = match &face.surface {
            Some(mesh) => face_triangulation(mesh, face.orientation)?,
            None => None,
        };
        faces.push(KernelFace { id, triangulation });
    }
    Ok(faces)
}

/// Convert a face mesh into a [`Triangulation`].
///
/// Quads and larger polygons are fanned into triangles. Reversed faces get
/// their corner order swapped here, so the triangulation carries the face's
/// outward winding. Returns `Ok(None)` for a mesh with no usable triangles.
fn face_triangulation(
    mesh: &PolygonMesh,
    orientation: bool,
) -> Result<Option<Triangulation>, KernelError> {
    let positions = mesh.positions();
    if positions.len() >= u32::MAX as usize {
        return Err(KernelError::TessellationFailed {
            reason: format!("face mesh has {} nodes", positions.len()),
        });
    }

    let nodes: Vec<[f64; 3]> = positions.iter().map(|p| [p[0], p[1], p[2]]).collect();
    let node = |pos: usize| pos as u32 + FIRST_NODE_INDEX;

    let mut triangles: Vec<[u32; 3]> = Vec::new();
    for tri in mesh.tri_faces() {
        triangles.push([node(tri[0].pos), node(tri[1].pos), node(tri[2].pos)]);
    }
    for quad in mesh.quad_faces() {
        triangles.push([node(quad[0].pos), node(quad[1].pos), node(quad[2].pos)]);
        triangles.push([node(quad[0].pos), node(quad[2].pos), node(quad[3].pos)]);
    }
    for poly in mesh.other_faces() {
        for i in 1..poly.len().saturating_sub(1) {
            triangles.push([node(poly[0].pos), node(poly[i].pos), node(poly[i + 1].pos)]);
        }
    }

    if !orientation {
        for tri in &mut triangles {
            tri.swap(1, 2);
        }
    }

    if nodes.is_empty() || triangles.is_empty() {
        return Ok(None);
    }

    Ok(Some(Triangulation {
        nodes,
        triangles,
        placement: Placement::identity(),
    }))
}

/// Signed volume enclosed by a set of face triangulations (divergence theorem).
/// Returns `None` if any face is missing its triangulation, since the surface
/// is then not closed.
pub fn enclosed_volume(faces: &[KernelFace]) -> Option<f64> {
    let mut six_volume = 0.0;
    for face in faces {
        let tri = face.triangulation.as_ref()?;
        let world: Vec<[f64; 3]> = tri
            .nodes
            .iter()
            .map(|&p| tri.placement.transform_point(p))
            .collect();
        for t in &tri.triangles {
            let a = world[(t[0] - FIRST_NODE_INDEX) as usize];
            let b = world[(t[1] - FIRST_NODE_INDEX) as usize];
            let c = world[(t[2] - FIRST_NODE_INDEX) as usize];
            six_volume += a[0] * (b[1] * c[2] - b[2] * c[1])
                - a[1] * (b[0] * c[2] - b[2] * c[0])
                + a[2] * (b[0] * c[1] - b[1] * c[0]);
        }
    }
    Some(six_volume / 6.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_tetra_faces() -> Vec<KernelFace> {
        // Outward-wound faces of the tetrahedron (0,0,0),(1,0,0),(0,1,0),(0,0,1).
        let nodes = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ];
        let triangles = vec![[1, 3, 2], [1, 2, 4], [1, 4, 3], [2, 3, 4]];
        vec![KernelFace {
            id: KernelId(1),
            triangulation: Some(Triangulation {
                nodes,
                triangles,
                placement: Placement::translation(5.0, -3.0, 2.0),
            }),
        }]
    }

    #[test]
    fn tetra_volume_is_one_sixth() {
        let v = enclosed_volume(&unit_tetra_faces()).unwrap();
        assert_relative_eq!(v, 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn open_surface_has_no_volume() {
        let mut faces = unit_tetra_faces();
        faces.push(KernelFace {
            id: KernelId(2),
            triangulation: None,
        });
        assert!(enclosed_volume(&faces).is_none());
    }
}
