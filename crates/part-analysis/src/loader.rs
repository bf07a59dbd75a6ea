//! Model loading through the kernel reader.

use std::path::Path;

use step_kernel::{GeometryKernel, ReadStatus, ShapeHandle};
use tracing::{debug, info, instrument};

use crate::errors::AnalysisError;

/// File extensions accepted as STEP input (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["step", "stp"];

/// Reject files whose extension is not a STEP extension.
pub fn check_extension(file_name: &Path) -> Result<(), AnalysisError> {
    let extension = file_name
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(AnalysisError::InputFormat { extension })
    }
}

/// Read `path` and retrieve its single shape.
///
/// Whatever status type the kernel reports is reduced to
/// [`ReadStatus::is_done`] here; nothing past the loader sees it.
#[instrument(skip(kernel))]
pub fn load<K: GeometryKernel>(kernel: &mut K, path: &Path) -> Result<ShapeHandle, AnalysisError> {
    let status = kernel.read_file(path);
    if !status.is_done() {
        return Err(AnalysisError::ModelLoad {
            reason: format!("reader returned {status:?}"),
        });
    }

    let roots = kernel.transfer_roots();
    debug!(roots, "transferred roots");
    if roots == 0 {
        return Err(AnalysisError::ModelLoad {
            reason: "no transferable roots".to_string(),
        });
    }

    let shape = kernel.one_shape().ok_or_else(|| AnalysisError::ModelLoad {
        reason: "retrieved shape is empty".to_string(),
    })?;
    info!("model loaded");
    Ok(shape)
}
