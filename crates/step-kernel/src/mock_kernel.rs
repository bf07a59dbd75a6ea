//! MockKernel: deterministic test double implementing GeometryKernel.
//!
//! Serves a preconfigured solid regardless of file contents, reports the
//! integer read sentinel, and lets tests switch off individual capabilities
//! (volume integration, per-face triangulation, tessellation itself).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::traits::GeometryKernel;
use crate::types::*;

/// A synthetic solid: faces with known triangulations, bounds and volume.
#[derive(Debug, Clone)]
pub struct MockSolid {
    /// Triangulation each face receives once the shape is tessellated.
    faces: Vec<Option<Triangulation>>,
    volume: Option<f64>,
}

impl MockSolid {
    /// Axis-aligned cuboid with its minimum corner at `origin`.
    ///
    /// Each of the 6 faces is a quad of 4 nodes and 2 outward-wound
    /// triangles, stored relative to `origin` with a translation placement.
    pub fn cuboid(origin: [f64; 3], length: f64, width: f64, height: f64) -> Self {
        let (l, w, h) = (length, width, height);
        let corners = [
            [0.0, 0.0, 0.0],
            [l, 0.0, 0.0],
            [l, w, 0.0],
            [0.0, w, 0.0],
            [0.0, 0.0, h],
            [l, 0.0, h],
            [l, w, h],
            [0.0, w, h],
        ];
        // Corner loops, counter-clockwise seen from outside.
        let quads = [
            [0, 3, 2, 1], // bottom (z = 0)
            [4, 5, 6, 7], // top (z = h)
            [0, 1, 5, 4], // front (y = 0)
            [2, 3, 7, 6], // back (y = w)
            [0, 4, 7, 3], // left (x = 0)
            [1, 2, 6, 5], // right (x = l)
        ];
        let placement = Placement::translation(origin[0], origin[1], origin[2]);

        let faces = quads
            .iter()
            .map(|q| {
                Some(Triangulation {
                    nodes: q.iter().map(|&c| corners[c]).collect(),
                    triangles: vec![[1, 2, 3], [1, 3, 4]],
                    placement,
                })
            })
            .collect();

        Self {
            faces,
            volume: Some(l * w * h),
        }
    }

    /// A solid built from arbitrary faces. No volume capability.
    pub fn from_faces(faces: Vec<Option<Triangulation>>) -> Self {
        Self {
            faces,
            volume: None,
        }
    }

    /// A null shape: the reader succeeds but yields nothing.
    pub fn empty() -> Self {
        Self::from_faces(Vec::new())
    }

    /// Drop the kernel's volumetric capability for this solid.
    pub fn without_volume(mut self) -> Self {
        self.volume = None;
        self
    }

    /// Append faces the mesher cannot triangulate.
    pub fn with_degenerate_faces(mut self, count: usize) -> Self {
        self.faces.extend(std::iter::repeat(None).take(count));
        self
    }

    /// Replace every triangulation with `None`, keeping the face count.
    pub fn untriangulable(mut self) -> Self {
        for face in &mut self.faces {
            *face = None;
        }
        self
    }

    /// Move the whole solid by `placement` (applied after each face's own).
    /// Volume is left untouched, so only rigid placements make sense here.
    pub fn placed(mut self, placement: Placement) -> Self {
        for tri in self.faces.iter_mut().flatten() {
            tri.placement = placement.after(&tri.placement);
        }
        self
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    fn bounds(&self) -> Option<RawBounds> {
        RawBounds::from_points(
            self.faces
                .iter()
                .flatten()
                .flat_map(|t| t.nodes.iter().map(move |&p| t.placement.transform_point(p))),
        )
    }
}

struct MockShape {
    solid: MockSolid,
    face_ids: Vec<KernelId>,
    tessellated: bool,
}

/// Deterministic test double for the geometry kernel.
pub struct MockKernel {
    next_id: u64,
    next_handle: u64,
    read_status: i32,
    solid: Option<MockSolid>,
    staged: Option<MockSolid>,
    transferred: Option<MockSolid>,
    shapes: HashMap<u64, MockShape>,
    fail_tessellation: bool,
    last_tessellation: Option<TessellationParams>,
    reads: Vec<PathBuf>,
}

impl MockKernel {
    /// A kernel whose reader succeeds and yields `solid` for any file.
    pub fn with_solid(solid: MockSolid) -> Self {
        Self {
            next_id: 1,
            next_handle: 1,
            read_status: 1,
            solid: Some(solid),
            staged: None,
            transferred: None,
            shapes: HashMap::new(),
            fail_tessellation: false,
            last_tessellation: None,
            reads: Vec::new(),
        }
    }

    /// A kernel whose reader reports `status` for every file.
    pub fn with_read_status(mut self, status: i32) -> Self {
        self.read_status = status;
        self
    }

    /// Make every `tessellate` call fail.
    pub fn failing_tessellation(mut self) -> Self {
        self.fail_tessellation = true;
        self
    }

    /// Paths passed to `read_file`, in call order.
    pub fn reads(&self) -> &[PathBuf] {
        &self.reads
    }

    /// Number of shapes issued and not yet released.
    pub fn live_shapes(&self) -> usize {
        self.shapes.len()
    }

    /// Parameters of the most recent `tessellate` call.
    pub fn last_tessellation(&self) -> Option<TessellationParams> {
        self.last_tessellation
    }

    fn get_shape(&self, handle: &ShapeHandle) -> Result<&MockShape, KernelError> {
        self.shapes
            .get(&handle.id())
            .ok_or(KernelError::ShapeNotFound { id: handle.id() })
    }
}

impl GeometryKernel for MockKernel {
    type Status = i32;

    fn read_file(&mut self, path: &Path) -> i32 {
        self.reads.push(path.to_path_buf());
        self.staged = None;
        if self.read_status.is_done() {
            self.staged = self.solid.clone();
        }
        self.read_status
    }

    fn transfer_roots(&mut self) -> usize {
        match self.staged.take() {
            Some(solid) => {
                self.transferred = Some(solid);
                1
            }
            None => 0,
        }
    }

    fn one_shape(&mut self) -> Option<ShapeHandle> {
        let solid = self.transferred.take()?;
        if solid.faces.is_empty() {
            return None;
        }

        let face_ids = (0..solid.faces.len())
            .map(|_| {
                let id = KernelId(self.next_id);
                self.next_id += 1;
                id
            })
            .collect();

        let handle = ShapeHandle(self.next_handle);
        self.next_handle += 1;
        self.shapes.insert(
            handle.id(),
            MockShape {
                solid,
                face_ids,
                tessellated: false,
            },
        );
        Some(handle)
    }

    fn bounding_box(&self, shape: &ShapeHandle) -> Result<RawBounds, KernelError> {
        self.get_shape(shape)?
            .solid
            .bounds()
            .ok_or(KernelError::VoidBoundingBox)
    }

    fn volume(&self, shape: &ShapeHandle) -> Result<Option<f64>, KernelError> {
        Ok(self.get_shape(shape)?.solid.volume)
    }

    fn tessellate(
        &mut self,
        shape: &ShapeHandle,
        params: &TessellationParams,
    ) -> Result<(), KernelError> {
        self.last_tessellation = Some(*params);
        if self.fail_tessellation {
            return Err(KernelError::TessellationFailed {
                reason: "mock mesher disabled".to_string(),
            });
        }
        let mock_shape = self
            .shapes
            .get_mut(&shape.id())
            .ok_or(KernelError::ShapeNotFound { id: shape.id() })?;
        mock_shape.tessellated = true;
        Ok(())
    }

    fn faces<'a>(&'a self, shape: &ShapeHandle) -> Result<FaceIter<'a>, KernelError> {
        let mock_shape = self.get_shape(shape)?;
        let tessellated = mock_shape.tessellated;
        Ok(Box::new(
            mock_shape
                .face_ids
                .iter()
                .zip(&mock_shape.solid.faces)
                .map(move |(&id, tri)| KernelFace {
                    id,
                    triangulation: if tessellated { tri.clone() } else { None },
                }),
        ))
    }

    fn release(&mut self, shape: ShapeHandle) {
        self.shapes.remove(&shape.id());
    }
}
