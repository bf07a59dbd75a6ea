//! Request and response envelopes, serialized as JSON.

use base64::Engine as _;
use part_analysis::MeshFormat;
use serde::{Deserialize, Serialize};

use crate::errors::{ServiceError, StatusClass};

/// Per-request analysis options shared by every entry point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOptions {
    /// Material name; omitted means the configured default.
    #[serde(default)]
    pub material: Option<String>,
    /// Mesh to export alongside the metrics.
    #[serde(default)]
    pub mesh: Option<MeshFormat>,
    /// Embed the mesh bytes in the reply instead of storing an artifact.
    #[serde(default)]
    pub embed_mesh: bool,
}

/// One analysis request: the uploaded file and its options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub file_name: String,
    /// File contents, base64 with the standard alphabet.
    pub data: String,
    #[serde(flatten)]
    pub options: AnalysisOptions,
}

impl AnalyzeRequest {
    pub fn new(file_name: impl Into<String>, bytes: &[u8], options: AnalysisOptions) -> Self {
        Self {
            file_name: file_name.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            options,
        }
    }

    pub fn decode_data(&self) -> Result<Vec<u8>, ServiceError> {
        base64::engine::general_purpose::STANDARD
            .decode(self.data.trim())
            .map_err(|e| ServiceError::BadRequest {
                reason: format!("file data is not base64: {e}"),
            })
    }
}

/// Body of every failed reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// A status class and the JSON body that goes with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusClass,
    pub body: serde_json::Value,
}

impl Reply {
    pub fn ok<T: Serialize>(body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self {
                status: StatusClass::Ok,
                body,
            },
            Err(e) => Self::error(&ServiceError::from(e)),
        }
    }

    pub fn error(err: &ServiceError) -> Self {
        Self {
            status: err.status_class(),
            body: serde_json::json!({ "error": err.to_string() }),
        }
    }
}
