use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Opaque handle to a shape held by a geometry kernel.
/// Valid only for the kernel session that issued it. Deliberately not `Clone`:
/// a handle is released back to its kernel exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct ShapeHandle(pub(crate) u64);

impl ShapeHandle {
    pub(crate) fn id(&self) -> u64 {
        self.0
    }
}

/// Transient kernel-internal face identifier, stable within one kernel session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KernelId(pub u64);

/// Errors from kernel operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KernelError {
    #[error("shape not found: {id}")]
    ShapeNotFound { id: u64 },

    #[error("bounding box is void")]
    VoidBoundingBox,

    #[error("tessellation failed: {reason}")]
    TessellationFailed { reason: String },

    #[error("STEP conversion failed: {reason}")]
    ConversionFailed { reason: String },

    #[error("kernel error: {message}")]
    Other { message: String },
}

/// Read status reported by the kernel's file reader.
///
/// Kernel bindings disagree on how success is spelled: some return the
/// integer `1`, others a named enum. Loaders only ever ask [`ReadStatus::is_done`].
pub trait ReadStatus: std::fmt::Debug {
    /// True only for the reader's single success sentinel.
    fn is_done(&self) -> bool;
}

/// Named reader status, as exposed by enum-style bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnStatus {
    /// Nothing was read (empty data section).
    Void,
    /// File read and parsed.
    Done,
    /// File could not be opened or decoded.
    Error,
    /// File was decoded but is not a usable STEP exchange structure.
    Fail,
}

impl ReadStatus for ReturnStatus {
    fn is_done(&self) -> bool {
        matches!(self, ReturnStatus::Done)
    }
}

/// Integer-style bindings report `1` for success.
impl ReadStatus for i32 {
    fn is_done(&self) -> bool {
        *self == 1
    }
}

/// Axis-aligned extents as reported by the kernel, in model units (mm).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawBounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl RawBounds {
    /// Smallest box containing every point, or `None` for an empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = [f64; 3]>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bounds = RawBounds {
            min: first,
            max: first,
        };
        for p in points {
            for i in 0..3 {
                bounds.min[i] = bounds.min[i].min(p[i]);
                bounds.max[i] = bounds.max[i].max(p[i]);
            }
        }
        Some(bounds)
    }
}

/// Triangulation tolerances handed straight through to the kernel mesher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TessellationParams {
    /// Maximum chordal deviation between surface and mesh (mm).
    pub linear_deflection: f64,
    /// Maximum angle between adjacent facet normals (radians).
    pub angular_deflection: f64,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self {
            linear_deflection: 0.1,
            angular_deflection: 0.5,
        }
    }
}

/// Location of a face's local triangulation frame in shape coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    matrix: Matrix4<f64>,
}

impl Placement {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            matrix: Matrix4::new_translation(&Vector3::new(x, y, z)),
        }
    }

    /// Rotation about the z axis through the origin.
    pub fn rotation_z(angle: f64) -> Self {
        Self {
            matrix: Matrix4::from_axis_angle(&Vector3::z_axis(), angle),
        }
    }

    /// `self` applied after `first`.
    pub fn after(&self, first: &Placement) -> Self {
        Self {
            matrix: self.matrix * first.matrix,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.matrix == Matrix4::identity()
    }

    pub fn transform_point(&self, p: [f64; 3]) -> [f64; 3] {
        let q = self.matrix.transform_point(&Point3::new(p[0], p[1], p[2]));
        [q.x, q.y, q.z]
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::identity()
    }
}

/// Index of the first node in a [`Triangulation`]. Triangle corners are
/// numbered from one, the B-rep triangulation convention.
pub const FIRST_NODE_INDEX: u32 = 1;

/// Triangulation of a single face, in the face's local frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangulation {
    /// Node positions before `placement` is applied.
    pub nodes: Vec<[f64; 3]>,
    /// Triangle corners as node numbers starting at [`FIRST_NODE_INDEX`].
    pub triangles: Vec<[u32; 3]>,
    pub placement: Placement,
}

impl Triangulation {
    pub fn nb_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn nb_triangles(&self) -> usize {
        self.triangles.len()
    }
}

/// One face yielded by face exploration. `triangulation` is `None` when the
/// kernel holds no mesh for the face (never tessellated, or degenerate).
#[derive(Debug, Clone)]
pub struct KernelFace {
    pub id: KernelId,
    pub triangulation: Option<Triangulation>,
}

/// Face exploration cursor. Finite and consumed as it is read.
pub type FaceIter<'a> = Box<dyn Iterator<Item = KernelFace> + 'a>;
