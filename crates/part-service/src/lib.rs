//! Service layer around the part analysis pipeline: request envelopes,
//! staged uploads, mesh artifacts and serialized kernel access.

pub mod artifacts;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod messages;
pub mod upload;
pub mod worker;

pub use artifacts::{Artifact, ArtifactStore};
pub use config::ServiceConfig;
pub use dispatch::PartService;
pub use errors::{ServiceError, StatusClass};
pub use messages::{AnalysisOptions, AnalyzeRequest, ErrorEnvelope, HealthStatus, Reply};
pub use upload::ScopedUpload;
pub use worker::{AnalysisJob, KernelWorker};
