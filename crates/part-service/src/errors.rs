use part_analysis::{AnalysisError, ConfigError};

/// Coarse classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Ok,
    ClientError,
    NotFound,
    ServerError,
}

impl StatusClass {
    /// HTTP-style status code for the class.
    pub fn code(self) -> u16 {
        match self {
            StatusClass::Ok => 200,
            StatusClass::ClientError => 400,
            StatusClass::NotFound => 404,
            StatusClass::ServerError => 500,
        }
    }
}

/// Errors surfaced by the service layer.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("invalid request: {reason}")]
    BadRequest { reason: String },

    #[error("artifact not found: {name}")]
    NotFound { name: String },

    #[error("analysis timed out after {after_ms} ms")]
    Timeout { after_ms: u128 },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("kernel queue is full ({depth} jobs waiting)")]
    Busy { depth: usize },

    #[error("kernel worker exited without a result")]
    WorkerPanicked,
}

impl ServiceError {
    pub fn status_class(&self) -> StatusClass {
        match self {
            ServiceError::Analysis(AnalysisError::InputFormat { .. })
            | ServiceError::BadRequest { .. } => StatusClass::ClientError,
            ServiceError::NotFound { .. } => StatusClass::NotFound,
            _ => StatusClass::ServerError,
        }
    }
}
