//! Persisted mesh artifacts and their retrieval.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use part_analysis::{ArtifactSink, ExportError, MeshFormat};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::ServiceError;

/// A fetched artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub name: String,
    pub format: MeshFormat,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// Directory of exported meshes named `<uuid>.<stl|glb>`.
///
/// Only names of that shape are ever resolved, so a fetch cannot reach
/// outside the directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[instrument(skip(self))]
    pub fn fetch(&self, name: &str) -> Result<Artifact, ServiceError> {
        let not_found = || ServiceError::NotFound {
            name: name.to_string(),
        };
        let format = parse_name(name).ok_or_else(not_found)?;
        match fs::read(self.dir.join(name)) {
            Ok(bytes) => Ok(Artifact {
                name: name.to_string(),
                format,
                bytes,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }
}

impl ArtifactSink for ArtifactStore {
    fn persist(&self, format: MeshFormat, bytes: &[u8]) -> Result<String, ExportError> {
        let name = format!("{}.{}", Uuid::new_v4(), format.extension());
        let write = || -> io::Result<()> {
            fs::create_dir_all(&self.dir)?;
            fs::write(self.dir.join(&name), bytes)
        };
        write().map_err(|e| ExportError::Persist {
            reason: e.to_string(),
        })?;
        debug!(name, bytes = bytes.len(), "artifact stored");
        Ok(name)
    }
}

fn parse_name(name: &str) -> Option<MeshFormat> {
    let (stem, ext) = name.split_once('.')?;
    Uuid::parse_str(stem).ok()?;
    if ext != ext.to_ascii_lowercase() {
        return None;
    }
    MeshFormat::from_extension(ext)
}
