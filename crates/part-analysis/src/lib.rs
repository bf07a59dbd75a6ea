//! Physical analysis of STEP parts: bounding box, dimensions, volume, weight,
//! and an optional visualization mesh.
//!
//! The pipeline is generic over [`step_kernel::GeometryKernel`]; see
//! [`AnalysisOrchestrator`] for the entry point.

pub mod config;
pub mod errors;
pub mod export;
pub mod loader;
pub mod materials;
pub mod mesh;
pub mod metrics;
pub mod orchestrator;
pub mod result;

pub use config::AnalysisConfig;
pub use errors::{AnalysisError, ConfigError, ExportError, MeshError};
pub use export::MeshFormat;
pub use materials::{MaterialDensityTable, DEFAULT_MATERIAL};
pub use mesh::{AssembledMesh, MeshBuffer};
pub use metrics::{BoundingBox, DimensionPolicy, Dimensions, PartMetrics, MM3_PER_M3};
pub use orchestrator::{
    AnalysisOrchestrator, AnalysisRequest, ArtifactSink, DeliveryMode, MeshRequest,
};
pub use result::{AnalysisRecord, AnalysisResult, MeshDelivery, MeshPayload, Warnings};
