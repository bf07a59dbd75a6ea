use std::path::Path;

use crate::types::*;

/// Capability contract of the geometry kernel.
/// Implemented by TruckKernel (truck STEP reader and mesher) and MockKernel
/// (deterministic test double).
///
/// Implementations are not expected to be reentrant: callers serialize
/// access to one kernel instance.
pub trait GeometryKernel {
    /// Status type the reader reports; each binding spells success its own way.
    type Status: ReadStatus;

    /// Read and decode a model file into the reader's staging area.
    fn read_file(&mut self, path: &Path) -> Self::Status;

    /// Convert staged roots into shapes. Returns the number of roots transferred.
    fn transfer_roots(&mut self) -> usize;

    /// Retrieve all transferred roots as a single shape, or `None` when the
    /// result is null or empty.
    fn one_shape(&mut self) -> Option<ShapeHandle>;

    /// Accumulate the axis-aligned bounding box of a shape.
    fn bounding_box(&self, shape: &ShapeHandle) -> Result<RawBounds, KernelError>;

    /// Exact volume by kernel integration (mm³). `Ok(None)` means the kernel
    /// has no volumetric capability for this shape.
    fn volume(&self, shape: &ShapeHandle) -> Result<Option<f64>, KernelError>;

    /// Triangulate every face of the shape, storing the result on the faces.
    fn tessellate(
        &mut self,
        shape: &ShapeHandle,
        params: &TessellationParams,
    ) -> Result<(), KernelError>;

    /// Explore the faces of a shape in the kernel's native order.
    fn faces<'a>(&'a self, shape: &ShapeHandle) -> Result<FaceIter<'a>, KernelError>;

    /// End the lifetime of a shape handle.
    fn release(&mut self, shape: ShapeHandle);
}
