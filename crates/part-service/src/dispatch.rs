use std::path::{Path, PathBuf};
use std::sync::Arc;

use part_analysis::loader::check_extension;
use part_analysis::{AnalysisOrchestrator, AnalysisRecord, MeshRequest};
use step_kernel::GeometryKernel;
use tracing::{info, instrument};

use crate::artifacts::{Artifact, ArtifactStore};
use crate::config::ServiceConfig;
use crate::errors::ServiceError;
use crate::messages::{AnalysisOptions, AnalyzeRequest, HealthStatus, Reply};
use crate::upload::ScopedUpload;
use crate::worker::{AnalysisJob, KernelWorker};

/// The part analysis service: one kernel, one artifact store, one config.
pub struct PartService<K> {
    config: Arc<ServiceConfig>,
    worker: KernelWorker<K>,
    artifacts: ArtifactStore,
}

impl<K> PartService<K>
where
    K: GeometryKernel + Send + 'static,
{
    /// Start the kernel thread. Fails only when the thread cannot be spawned.
    pub fn new(kernel: K, config: ServiceConfig) -> Result<Self, ServiceError> {
        let orchestrator = AnalysisOrchestrator::new(config.analysis.clone());
        let worker = KernelWorker::new(
            kernel,
            orchestrator,
            config.kernel_timeout(),
            config.queue_depth,
        )?;
        let artifacts = ArtifactStore::new(config.artifact_dir.clone());
        Ok(Self {
            config: Arc::new(config),
            worker,
            artifacts,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Analyze an uploaded file. The staged copy is removed before returning,
    /// timeouts included.
    #[instrument(skip_all, fields(file = %request.file_name))]
    pub fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisRecord, ServiceError> {
        check_extension(Path::new(&request.file_name))?;
        let bytes = request.decode_data()?;
        let upload = ScopedUpload::write(&self.config.upload_dir, &request.file_name, &bytes)?;
        self.submit(
            upload.path().to_path_buf(),
            request.file_name.clone(),
            &request.options,
        )
    }

    /// Analyze a file already on disk. The file is left in place.
    pub fn analyze_file(
        &self,
        path: &Path,
        options: &AnalysisOptions,
    ) -> Result<AnalysisRecord, ServiceError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ServiceError::BadRequest {
                reason: format!("no usable file name in {}", path.display()),
            })?
            .to_string();
        check_extension(Path::new(&file_name))?;
        self.submit(path.to_path_buf(), file_name, options)
    }

    pub fn fetch_artifact(&self, name: &str) -> Result<Artifact, ServiceError> {
        self.artifacts.fetch(name)
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus::ok()
    }

    /// JSON in, reply out. Failures become an error envelope with their
    /// status class.
    pub fn dispatch_json(&self, body: &str) -> Reply {
        let outcome = serde_json::from_str::<AnalyzeRequest>(body)
            .map_err(|e| ServiceError::BadRequest {
                reason: e.to_string(),
            })
            .and_then(|request| self.analyze(&request));
        match outcome {
            Ok(record) => Reply::ok(&record),
            Err(e) => Reply::error(&e),
        }
    }

    fn submit(
        &self,
        path: PathBuf,
        file_name: String,
        options: &AnalysisOptions,
    ) -> Result<AnalysisRecord, ServiceError> {
        let mesh = options.mesh.map(|format| {
            if options.embed_mesh {
                MeshRequest::embedded(format)
            } else {
                MeshRequest::by_reference(format)
            }
        });
        let job = AnalysisJob {
            path,
            file_name,
            material: options.material.clone(),
            mesh,
            artifacts: Some(self.artifacts.clone()),
        };
        let record = self.worker.run(job)?.to_record();
        info!(
            weight_kg = record.weight_kg,
            mesh = record.mesh.is_some(),
            "request served"
        );
        Ok(record)
    }
}
