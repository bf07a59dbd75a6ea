use step_kernel::{KernelError, KernelId};

/// Fatal errors of one part analysis.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    #[error("unsupported input format: {extension:?}")]
    InputFormat { extension: String },

    #[error("failed to read STEP: {reason}")]
    ModelLoad { reason: String },

    #[error("geometry computation failed: {reason}")]
    Geometry { reason: String },

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Errors while assembling the global mesh buffer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MeshError {
    #[error("no face of the shape carries a triangulation ({faces_skipped} skipped)")]
    Empty { faces_skipped: usize },

    #[error("face {face:?} references node {node} but has {node_count} nodes")]
    CorruptTriangulation {
        face: KernelId,
        node: u32,
        node_count: usize,
    },

    #[error("mesh exceeds {max} vertices")]
    TooManyVertices { max: u32 },

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),
}

/// Errors while serializing a mesh buffer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExportError {
    #[error("index {index} out of range (vertex count = {vertex_count})")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("mesh too large for {format}: {reason}")]
    TooLarge { format: &'static str, reason: String },

    #[error("failed to persist mesh artifact: {reason}")]
    Persist { reason: String },
}

/// Errors loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid density for {material:?}: {density}")]
    InvalidDensity { material: String, density: f64 },
}
