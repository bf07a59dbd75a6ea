//! TruckKernel: real geometry kernel wrapping truck's STEP reader and mesher.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};
use truck_stepio::r#in::Table;

use crate::tessellation;
use crate::traits::GeometryKernel;
use crate::types::*;

/// A shape assembled from every transferred root shell of one STEP file.
struct StepShape {
    table: Table,
    shell_ids: Vec<u64>,
    /// Per-face triangulations, filled by `tessellate`.
    faces: Option<Vec<KernelFace>>,
    /// Coarse triangulation for bounds and volume, built on first use.
    bounds_faces: OnceCell<Vec<KernelFace>>,
}

/// Real geometry kernel backed by truck-stepio and truck-meshalgo.
pub struct TruckKernel {
    next_handle: u64,
    next_id: u64,
    /// Table decoded by the last successful `read_file`.
    staged: Option<Table>,
    /// Shell ids converted by `transfer_roots`, awaiting `one_shape`.
    roots: Vec<u64>,
    shapes: HashMap<u64, StepShape>,
    /// Mesh tolerance used when a bounding box is requested before tessellation.
    bounds_tolerance: f64,
}

impl TruckKernel {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            next_id: 1,
            staged: None,
            roots: Vec::new(),
            shapes: HashMap::new(),
            bounds_tolerance: TessellationParams::default().linear_deflection,
        }
    }

    fn get_shape(&self, handle: &ShapeHandle) -> Result<&StepShape, KernelError> {
        self.shapes
            .get(&handle.id())
            .ok_or(KernelError::ShapeNotFound { id: handle.id() })
    }

    /// Faces of the shape: the stored tessellation if there is one, otherwise a
    /// triangulation at the bounds tolerance, meshed once per shape.
    fn mesh_faces<'a>(&self, shape: &'a StepShape) -> Result<&'a [KernelFace], KernelError> {
        if let Some(faces) = &shape.faces {
            return Ok(faces);
        }
        if let Some(faces) = shape.bounds_faces.get() {
            return Ok(faces);
        }
        let mut scratch_id = 0;
        let mut faces = Vec::new();
        for &shell_id in &shape.shell_ids {
            faces.extend(tessellation::triangulate_shell(
                &shape.table,
                shell_id,
                self.bounds_tolerance,
                &mut scratch_id,
            )?);
        }
        Ok(shape.bounds_faces.get_or_init(|| faces))
    }
}

impl Default for TruckKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryKernel for TruckKernel {
    type Status = ReturnStatus;

    fn read_file(&mut self, path: &Path) -> ReturnStatus {
        self.staged = None;
        self.roots.clear();

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read model file");
                return ReturnStatus::Error;
            }
        };

        let Some(table) = Table::from_step(&text) else {
            warn!(path = %path.display(), "file is not a STEP exchange structure");
            return ReturnStatus::Fail;
        };

        if table.shell.is_empty() {
            return ReturnStatus::Void;
        }

        debug!(shells = table.shell.len(), "STEP file decoded");
        self.staged = Some(table);
        ReturnStatus::Done
    }

    fn transfer_roots(&mut self) -> usize {
        let Some(table) = &self.staged else {
            return 0;
        };

        let mut ids: Vec<u64> = table.shell.keys().copied().collect();
        ids.sort_unstable();

        self.roots = ids
            .into_iter()
            .filter(|id| match table.to_compressed_shell(&table.shell[id]) {
                Ok(_) => true,
                Err(e) => {
                    warn!(shell = id, error = %e, "skipping shell that failed to convert");
                    false
                }
            })
            .collect();
        self.roots.len()
    }

    fn one_shape(&mut self) -> Option<ShapeHandle> {
        if self.roots.is_empty() {
            return None;
        }
        let table = self.staged.take()?;
        let handle = ShapeHandle(self.next_handle);
        self.next_handle += 1;
        self.shapes.insert(
            handle.id(),
            StepShape {
                table,
                shell_ids: std::mem::take(&mut self.roots),
                faces: None,
                bounds_faces: OnceCell::new(),
            },
        );
        Some(handle)
    }

    fn bounding_box(&self, shape: &ShapeHandle) -> Result<RawBounds, KernelError> {
        let step_shape = self.get_shape(shape)?;
        let faces = self.mesh_faces(step_shape)?;
        let points = faces
            .iter()
            .filter_map(|f| f.triangulation.as_ref())
            .flat_map(|t| t.nodes.iter().map(move |&p| t.placement.transform_point(p)));
        RawBounds::from_points(points).ok_or(KernelError::VoidBoundingBox)
    }

    fn volume(&self, shape: &ShapeHandle) -> Result<Option<f64>, KernelError> {
        let step_shape = self.get_shape(shape)?;
        let faces = self.mesh_faces(step_shape)?;
        Ok(tessellation::enclosed_volume(faces).map(f64::abs))
    }

    fn tessellate(
        &mut self,
        shape: &ShapeHandle,
        params: &TessellationParams,
    ) -> Result<(), KernelError> {
        if params.linear_deflection.is_nan() || params.linear_deflection <= 0.0 {
            return Err(KernelError::TessellationFailed {
                reason: format!("linear deflection {} is not positive", params.linear_deflection),
            });
        }
        // truck's mesher takes a single chordal tolerance.
        debug!(
            linear = params.linear_deflection,
            angular = params.angular_deflection,
            "tessellating shape"
        );

        let step_shape = self
            .shapes
            .get(&shape.id())
            .ok_or(KernelError::ShapeNotFound { id: shape.id() })?;
        let mut faces = Vec::new();
        for &shell_id in &step_shape.shell_ids {
            faces.extend(tessellation::triangulate_shell(
                &step_shape.table,
                shell_id,
                params.linear_deflection,
                &mut self.next_id,
            )?);
        }

        if let Some(step_shape) = self.shapes.get_mut(&shape.id()) {
            step_shape.faces = Some(faces);
        }
        Ok(())
    }

    fn faces<'a>(&'a self, shape: &ShapeHandle) -> Result<FaceIter<'a>, KernelError> {
        let step_shape = self.get_shape(shape)?;
        match &step_shape.faces {
            Some(faces) => Ok(Box::new(faces.iter().cloned())),
            // Untessellated: faces exist but carry no triangulation.
            None => {
                let mut scratch_id = 0;
                let mut ids = Vec::new();
                for &shell_id in &step_shape.shell_ids {
                    let holder = &step_shape.table.shell[&shell_id];
                    let shell = step_shape.table.to_compressed_shell(holder).map_err(|e| {
                        KernelError::ConversionFailed {
                            reason: format!("shell #{shell_id}: {e}"),
                        }
                    })?;
                    ids.extend(shell.faces.iter().map(|_| {
                        scratch_id += 1;
                        KernelId(scratch_id)
                    }));
                }
                Ok(Box::new(ids.into_iter().map(|id| KernelFace {
                    id,
                    triangulation: None,
                })))
            }
        }
    }

    fn release(&mut self, shape: ShapeHandle) {
        self.shapes.remove(&shape.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives;
    use approx::assert_relative_eq;
    use std::path::PathBuf;

    fn write_step(name: &str, text: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "step-kernel-{}-{}.step",
            std::process::id(),
            name
        ));
        std::fs::write(&path, text).unwrap();
        path
    }

    fn load_box(
        name: &str,
        origin: [f64; 3],
        w: f64,
        h: f64,
        d: f64,
    ) -> (TruckKernel, ShapeHandle) {
        let solid = primitives::make_box(origin, w, h, d);
        let path = write_step(name, &primitives::to_step_string(&solid, "box.step"));

        let mut kernel = TruckKernel::new();
        assert_eq!(kernel.read_file(&path), ReturnStatus::Done);
        assert!(kernel.transfer_roots() > 0);
        let shape = kernel.one_shape().unwrap();
        std::fs::remove_file(&path).ok();
        (kernel, shape)
    }

    #[test]
    fn missing_file_reports_error_status() {
        let mut kernel = TruckKernel::new();
        let status = kernel.read_file(Path::new("/nonexistent/part.step"));
        assert_eq!(status, ReturnStatus::Error);
        assert_eq!(kernel.transfer_roots(), 0);
        assert!(kernel.one_shape().is_none());
    }

    #[test]
    fn garbage_file_is_not_done() {
        let path = write_step("garbage", "this is not a STEP file");
        let mut kernel = TruckKernel::new();
        let status = kernel.read_file(&path);
        std::fs::remove_file(&path).ok();
        assert!(!status.is_done());
    }

    #[test]
    fn box_bounding_box_and_volume() {
        let (kernel, shape) = load_box("bbox", [1.0, 2.0, 3.0], 10.0, 5.0, 2.0);

        let b = kernel.bounding_box(&shape).unwrap();
        assert_relative_eq!(b.min[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(b.max[0], 11.0, epsilon = 1e-6);
        assert_relative_eq!(b.max[1] - b.min[1], 5.0, epsilon = 1e-6);
        assert_relative_eq!(b.max[2] - b.min[2], 2.0, epsilon = 1e-6);

        let v = kernel.volume(&shape).unwrap().unwrap();
        assert_relative_eq!(v, 100.0, epsilon = 1e-6);
    }

    #[test]
    fn bounds_mesh_is_built_once() {
        let (kernel, shape) = load_box("bounds-once", [0.0, 0.0, 0.0], 2.0, 2.0, 2.0);
        let step_shape = kernel.get_shape(&shape).unwrap();
        assert!(step_shape.bounds_faces.get().is_none());

        kernel.bounding_box(&shape).unwrap();
        let first = step_shape.bounds_faces.get().unwrap().as_ptr();
        kernel.volume(&shape).unwrap();
        kernel.bounding_box(&shape).unwrap();
        assert_eq!(step_shape.bounds_faces.get().unwrap().as_ptr(), first);
        assert_eq!(kernel.mesh_faces(step_shape).unwrap().as_ptr(), first);
    }

    #[test]
    fn faces_untriangulated_until_tessellated() {
        let (mut kernel, shape) = load_box("tess", [0.0, 0.0, 0.0], 1.0, 1.0, 1.0);

        let before: Vec<_> = kernel.faces(&shape).unwrap().collect();
        assert_eq!(before.len(), 6);
        assert!(before.iter().all(|f| f.triangulation.is_none()));

        kernel
            .tessellate(&shape, &TessellationParams::default())
            .unwrap();
        let after: Vec<_> = kernel.faces(&shape).unwrap().collect();
        assert_eq!(after.len(), 6);
        for face in &after {
            let tri = face.triangulation.as_ref().unwrap();
            assert!(tri.nb_triangles() >= 2);
            for t in &tri.triangles {
                for &i in t {
                    assert!(i >= FIRST_NODE_INDEX);
                    assert!((i - FIRST_NODE_INDEX) as usize <= tri.nb_nodes() - 1);
                }
            }
        }
    }

    #[test]
    fn non_positive_deflection_is_rejected() {
        let (mut kernel, shape) = load_box("deflect", [0.0, 0.0, 0.0], 1.0, 1.0, 1.0);
        let params = TessellationParams {
            linear_deflection: 0.0,
            ..Default::default()
        };
        assert!(kernel.tessellate(&shape, &params).is_err());
    }

    #[test]
    fn released_shape_is_gone() {
        let (mut kernel, shape) = load_box("release", [0.0, 0.0, 0.0], 1.0, 1.0, 1.0);
        let id = shape.id();
        kernel.release(shape);
        assert!(matches!(
            kernel.bounding_box(&ShapeHandle(id)),
            Err(KernelError::ShapeNotFound { .. })
        ));
    }
}
