//! Service configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use part_analysis::{AnalysisConfig, ConfigError};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// Default time a caller waits for the kernel before giving up.
pub const DEFAULT_KERNEL_TIMEOUT_MS: u64 = 120_000;

/// Default number of jobs allowed to wait for the kernel.
pub const DEFAULT_QUEUE_DEPTH: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub analysis: AnalysisConfig,
    /// Where uploaded STEP bytes are staged for the reader.
    pub upload_dir: PathBuf,
    /// Where by-reference mesh artifacts are kept.
    pub artifact_dir: PathBuf,
    pub kernel_timeout_ms: u64,
    /// Jobs waiting behind the one on the kernel; more are rejected.
    pub queue_depth: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let root = std::env::temp_dir().join("part-service");
        Self {
            analysis: AnalysisConfig::default(),
            upload_dir: root.join("uploads"),
            artifact_dir: root.join("artifacts"),
            kernel_timeout_ms: DEFAULT_KERNEL_TIMEOUT_MS,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

impl ServiceConfig {
    /// Everything under one directory, for tests and one-off runs.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            upload_dir: root.join("uploads"),
            artifact_dir: root.join("artifacts"),
            ..Self::default()
        }
    }

    pub fn kernel_timeout(&self) -> Duration {
        Duration::from_millis(self.kernel_timeout_ms)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.analysis.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ServiceError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::from)?;
        Ok(Self::from_json(&text)?)
    }
}
