//! One analysis request from file to result.
//!
//! Load failures and metric failures abort the request. Mesh failures do
//! not: the metrics are returned with `mesh_error` set instead. The shape
//! handle is released on every path once it has been obtained.

use std::path::Path;

use step_kernel::{GeometryKernel, ShapeHandle};
use tracing::{info, instrument, warn};

use crate::config::AnalysisConfig;
use crate::errors::{AnalysisError, ExportError, MeshError};
use crate::export::{self, MeshFormat};
use crate::loader;
use crate::materials::MaterialDensityTable;
use crate::mesh;
use crate::metrics::MetricsExtractor;
use crate::result::{AnalysisResult, MeshDelivery, MeshPayload, Warnings};

/// Destination for mesh bytes that are delivered by reference.
pub trait ArtifactSink {
    /// Store `bytes` and return the opaque name they can be fetched under.
    fn persist(&self, format: MeshFormat, bytes: &[u8]) -> Result<String, ExportError>;
}

/// How the caller wants the mesh handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    #[default]
    Embed,
    Reference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshRequest {
    pub format: MeshFormat,
    pub delivery: DeliveryMode,
}

impl MeshRequest {
    pub fn embedded(format: MeshFormat) -> Self {
        Self {
            format,
            delivery: DeliveryMode::Embed,
        }
    }

    pub fn by_reference(format: MeshFormat) -> Self {
        Self {
            format,
            delivery: DeliveryMode::Reference,
        }
    }
}

/// A single analysis request.
#[derive(Debug, Clone)]
pub struct AnalysisRequest<'a> {
    /// Where the STEP bytes live.
    pub path: &'a Path,
    /// Name the caller knows the file by; its extension is checked.
    pub file_name: &'a str,
    /// Material name. `None` or blank selects the configured default.
    pub material: Option<&'a str>,
    pub mesh: Option<MeshRequest>,
}

impl<'a> AnalysisRequest<'a> {
    pub fn new(path: &'a Path, file_name: &'a str) -> Self {
        Self {
            path,
            file_name,
            material: None,
            mesh: None,
        }
    }

    pub fn with_material(mut self, material: &'a str) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_mesh(mut self, mesh: MeshRequest) -> Self {
        self.mesh = Some(mesh);
        self
    }
}

/// Runs analysis requests against a kernel with a fixed configuration.
#[derive(Debug, Clone)]
pub struct AnalysisOrchestrator {
    config: AnalysisConfig,
    densities: MaterialDensityTable,
}

impl Default for AnalysisOrchestrator {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl AnalysisOrchestrator {
    pub fn new(config: AnalysisConfig) -> Self {
        let densities = config.density_table();
        Self { config, densities }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn densities(&self) -> &MaterialDensityTable {
        &self.densities
    }

    /// Analyze one file. `sink` is only consulted for by-reference meshes.
    #[instrument(skip_all, fields(file = request.file_name))]
    pub fn analyze<K: GeometryKernel>(
        &self,
        kernel: &mut K,
        request: &AnalysisRequest<'_>,
        sink: Option<&dyn ArtifactSink>,
    ) -> Result<AnalysisResult, AnalysisError> {
        loader::check_extension(Path::new(request.file_name))?;
        let shape = loader::load(kernel, request.path)?;
        let outcome = self.analyze_shape(kernel, &shape, request, sink);
        kernel.release(shape);
        outcome
    }

    fn analyze_shape<K: GeometryKernel>(
        &self,
        kernel: &mut K,
        shape: &ShapeHandle,
        request: &AnalysisRequest<'_>,
        sink: Option<&dyn ArtifactSink>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let material = request
            .material
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.config.default_material)
            .to_string();

        let metrics = MetricsExtractor::new(&self.densities, self.config.dimension_policy)
            .extract(kernel, shape, &material)?;

        let mut warnings = Warnings {
            faces_skipped: 0,
            unknown_material: metrics.density.fallback,
        };

        let (mesh, mesh_error) = match request.mesh {
            None => (None, None),
            Some(mesh_request) => match self.build_mesh(
                kernel,
                shape,
                mesh_request,
                request.file_name,
                sink,
                &mut warnings,
            ) {
                Ok(payload) => (Some(payload), None),
                Err(e) => {
                    warn!(error = %e, "mesh generation failed, returning metrics only");
                    (None, Some(e.to_string()))
                }
            },
        };

        info!(
            volume_mm3 = metrics.volume.volume_mm3,
            weight_kg = metrics.volume.weight_kg,
            approximate = metrics.volume.approximate,
            mesh = mesh.is_some(),
            "analysis complete"
        );

        Ok(AnalysisResult {
            file_name: request.file_name.to_string(),
            material,
            metrics,
            mesh,
            mesh_error,
            warnings,
        })
    }

    fn build_mesh<K: GeometryKernel>(
        &self,
        kernel: &mut K,
        shape: &ShapeHandle,
        request: MeshRequest,
        file_name: &str,
        sink: Option<&dyn ArtifactSink>,
        warnings: &mut Warnings,
    ) -> Result<MeshPayload, AnalysisError> {
        kernel
            .tessellate(shape, &self.config.tessellation)
            .map_err(MeshError::from)?;

        let assembled = match mesh::assemble(kernel, shape) {
            Ok(assembled) => assembled,
            Err(MeshError::Empty { faces_skipped }) => {
                warnings.faces_skipped = faces_skipped;
                return Err(MeshError::Empty { faces_skipped }.into());
            }
            Err(e) => return Err(e.into()),
        };
        warnings.faces_skipped = assembled.faces_skipped;
        if assembled.faces_skipped > 0 {
            warn!(
                skipped = assembled.faces_skipped,
                "faces without triangulation were left out of the mesh"
            );
        }

        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);
        let bytes = export::export(&assembled.buffer, request.format, stem)?;

        let delivery = match request.delivery {
            DeliveryMode::Embed => MeshDelivery::Embedded(bytes),
            DeliveryMode::Reference => {
                let sink = sink.ok_or_else(|| ExportError::Persist {
                    reason: "no artifact store configured".to_string(),
                })?;
                MeshDelivery::Reference(sink.persist(request.format, &bytes)?)
            }
        };

        Ok(MeshPayload {
            format: request.format,
            delivery,
            vertex_count: assembled.buffer.vertex_count(),
            triangle_count: assembled.buffer.face_count(),
        })
    }
}
