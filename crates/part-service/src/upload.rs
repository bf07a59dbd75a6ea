//! Temporary storage for uploaded model files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

/// An uploaded file on disk, removed when dropped.
///
/// The file name is a fresh UUID carrying the original (lower-cased)
/// extension, so the reader can still dispatch on it.
#[derive(Debug)]
pub struct ScopedUpload {
    path: PathBuf,
}

impl ScopedUpload {
    pub fn write(dir: &Path, original_name: &str, bytes: &[u8]) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let id = Uuid::new_v4();
        let name = match Path::new(original_name).extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{id}.{}", ext.to_ascii_lowercase()),
            None => id.to_string(),
        };
        let path = dir.join(name);
        fs::write(&path, bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "upload staged");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedUpload {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "upload removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove upload"),
        }
    }
}
