//! Assembly of per-face kernel triangulations into one indexed mesh buffer.
//!
//! Faces are visited once, in the kernel's exploration order. Each face's
//! nodes are moved into shape coordinates by its placement and appended; its
//! triangles are re-based onto the global vertex list. Winding is copied as
//! given and boundary vertices shared between faces are not welded.

use serde::Serialize;
use step_kernel::{GeometryKernel, KernelFace, ShapeHandle, FIRST_NODE_INDEX};
use tracing::{debug, instrument};

use crate::errors::MeshError;

/// Globally indexed triangle mesh. Every index is below `vertices.len()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeshBuffer {
    pub vertices: Vec<[f64; 3]>,
    pub faces: Vec<[u32; 3]>,
}

impl MeshBuffer {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Largest index referenced by any triangle.
    pub fn max_index(&self) -> Option<u32> {
        self.faces.iter().flat_map(|f| f.iter().copied()).max()
    }
}

/// A mesh buffer plus the number of faces that had no triangulation.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledMesh {
    pub buffer: MeshBuffer,
    pub faces_skipped: usize,
}

/// Merge the triangulations of every face of an already tessellated shape.
#[instrument(skip_all)]
pub fn assemble<K: GeometryKernel>(
    kernel: &K,
    shape: &ShapeHandle,
) -> Result<AssembledMesh, MeshError> {
    let faces = kernel.faces(shape)?;
    let assembled = assemble_faces(faces)?;
    debug!(
        vertices = assembled.buffer.vertex_count(),
        triangles = assembled.buffer.face_count(),
        skipped = assembled.faces_skipped,
        "mesh assembled"
    );
    Ok(assembled)
}

/// Merge a stream of kernel faces. See [`assemble`].
pub fn assemble_faces<I>(faces: I) -> Result<AssembledMesh, MeshError>
where
    I: IntoIterator<Item = KernelFace>,
{
    let mut buffer = MeshBuffer::default();
    let mut faces_skipped = 0;

    for face in faces {
        let Some(tri) = face.triangulation else {
            faces_skipped += 1;
            continue;
        };

        let vertex_offset = buffer.vertices.len();
        let node_count = tri.nodes.len();
        if vertex_offset + node_count > u32::MAX as usize {
            return Err(MeshError::TooManyVertices { max: u32::MAX });
        }
        let base = vertex_offset as u32;

        buffer.vertices.extend(
            tri.nodes
                .iter()
                .map(|&node| tri.placement.transform_point(node)),
        );

        buffer.faces.reserve(tri.triangles.len());
        for corners in &tri.triangles {
            let mut global = [0u32; 3];
            for (slot, &node) in global.iter_mut().zip(corners) {
                let local = node.wrapping_sub(FIRST_NODE_INDEX);
                if node < FIRST_NODE_INDEX || local as usize >= node_count {
                    return Err(MeshError::CorruptTriangulation {
                        face: face.id,
                        node,
                        node_count,
                    });
                }
                *slot = base + local;
            }
            buffer.faces.push(global);
        }
    }

    if buffer.is_empty() {
        return Err(MeshError::Empty { faces_skipped });
    }

    Ok(AssembledMesh {
        buffer,
        faces_skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use step_kernel::{KernelId, Placement, Triangulation};

    fn face(id: u64, triangulation: Option<Triangulation>) -> KernelFace {
        KernelFace {
            id: KernelId(id),
            triangulation,
        }
    }

    fn unit_triangle(placement: Placement) -> Triangulation {
        Triangulation {
            nodes: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            triangles: vec![[1, 2, 3]],
            placement,
        }
    }

    #[test]
    fn second_face_is_offset_by_first_face_nodes() {
        let faces = vec![
            face(1, Some(unit_triangle(Placement::identity()))),
            face(2, Some(unit_triangle(Placement::translation(0.0, 0.0, 5.0)))),
        ];
        let mesh = assemble_faces(faces).unwrap();
        assert_eq!(mesh.buffer.faces, vec![[0, 1, 2], [3, 4, 5]]);
        assert_eq!(mesh.buffer.vertices[3], [0.0, 0.0, 5.0]);
        assert_eq!(mesh.faces_skipped, 0);
    }

    #[test]
    fn rotated_placement_moves_nodes() {
        let rotated = Placement::translation(10.0, 0.0, 0.0)
            .after(&Placement::rotation_z(std::f64::consts::FRAC_PI_2));
        let mesh = assemble_faces(vec![face(1, Some(unit_triangle(rotated)))]).unwrap();
        let v = &mesh.buffer.vertices;
        // (1, 0, 0) turns to (0, 1, 0), then shifts along x.
        assert_relative_eq!(v[1][0], 10.0, epsilon = 1e-12);
        assert_relative_eq!(v[1][1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(v[2][0], 9.0, epsilon = 1e-12);
        assert_relative_eq!(v[2][1], 0.0, epsilon = 1e-12);
        assert_eq!(mesh.buffer.faces, vec![[0, 1, 2]]);
    }

    #[test]
    fn winding_is_preserved() {
        let mut tri = unit_triangle(Placement::identity());
        tri.triangles = vec![[3, 2, 1]];
        let mesh = assemble_faces(vec![face(1, Some(tri))]).unwrap();
        assert_eq!(mesh.buffer.faces, vec![[2, 1, 0]]);
    }

    #[test]
    fn untriangulated_faces_are_counted_not_fatal() {
        let faces = vec![
            face(1, None),
            face(2, Some(unit_triangle(Placement::identity()))),
            face(3, None),
        ];
        let mesh = assemble_faces(faces).unwrap();
        assert_eq!(mesh.faces_skipped, 2);
        assert_eq!(mesh.buffer.face_count(), 1);
    }

    #[test]
    fn all_faces_untriangulated_is_empty_error() {
        let faces = vec![face(1, None), face(2, None)];
        assert!(matches!(
            assemble_faces(faces),
            Err(MeshError::Empty { faces_skipped: 2 })
        ));
        assert!(matches!(
            assemble_faces(Vec::<KernelFace>::new()),
            Err(MeshError::Empty { faces_skipped: 0 })
        ));
    }

    #[test]
    fn zero_and_overflowing_node_numbers_are_rejected() {
        for bad in [0, 4] {
            let mut tri = unit_triangle(Placement::identity());
            tri.triangles = vec![[1, 2, bad]];
            match assemble_faces(vec![face(7, Some(tri))]) {
                Err(MeshError::CorruptTriangulation {
                    face,
                    node,
                    node_count,
                }) => {
                    assert_eq!(face, KernelId(7));
                    assert_eq!(node, bad);
                    assert_eq!(node_count, 3);
                }
                other => panic!("expected corrupt triangulation, got {other:?}"),
            }
        }
    }

    #[test]
    fn nodes_without_triangles_are_empty() {
        let mut tri = unit_triangle(Placement::identity());
        tri.triangles.clear();
        assert!(matches!(
            assemble_faces(vec![face(1, Some(tri))]),
            Err(MeshError::Empty { faces_skipped: 0 })
        ));
    }
}
