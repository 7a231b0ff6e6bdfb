//! Filesystem-backed artifact store.
//!
//! Two flat directories: raw uploads (opaque id + original extension) and
//! generated images (opaque id + `.png`). Artifacts are write-once — every
//! save mints a fresh identifier, nothing is ever mutated in place, and
//! nothing is deleted. That immutability is what makes concurrent requests
//! against the same handle safe without locks.
//!
//! Identifiers are UUIDv4 hex, optionally carrying a short role prefix
//! (`view_`, `sky_`) on derived artifacts. Handle resolution validates the
//! id as a single safe path component before touching the filesystem.

use image::RgbaImage;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact not found: {0}")]
    NotFound(String),
    #[error("invalid artifact id: {0}")]
    InvalidId(String),
    #[error("PNG encode failed: {0}")]
    Encode(String),
}

/// A persisted artifact: its opaque handle, the URL it is served under, and
/// where it lives on disk.
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub id: String,
    pub url: String,
    pub path: PathBuf,
}

pub struct ArtifactStore {
    upload_dir: PathBuf,
    gen_dir: PathBuf,
}

impl ArtifactStore {
    /// Open a store, creating both directories if needed.
    pub fn open(
        upload_dir: impl Into<PathBuf>,
        gen_dir: impl Into<PathBuf>,
    ) -> std::io::Result<Self> {
        let upload_dir = upload_dir.into();
        let gen_dir = gen_dir.into();
        std::fs::create_dir_all(&upload_dir)?;
        std::fs::create_dir_all(&gen_dir)?;
        Ok(Self {
            upload_dir,
            gen_dir,
        })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn gen_dir(&self) -> &Path {
        &self.gen_dir
    }

    fn fresh_id() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Persist raw upload bytes under a fresh id with the declared extension.
    pub fn save_upload(&self, ext: &str, bytes: &[u8]) -> Result<StoredArtifact, StoreError> {
        let name = format!("{}.{ext}", Self::fresh_id());
        let path = self.upload_dir.join(&name);
        std::fs::write(&path, bytes)?;
        Ok(StoredArtifact {
            url: format!("/uploads/{name}"),
            id: name,
            path,
        })
    }

    /// Persist a generated raster as lossless PNG under a fresh id.
    ///
    /// `prefix` is the artifact role (`""` for previews, `"view_"`, `"sky_"`).
    pub fn save_generated(
        &self,
        prefix: &str,
        img: &RgbaImage,
    ) -> Result<StoredArtifact, StoreError> {
        let name = format!("{prefix}{}.png", Self::fresh_id());
        let path = self.gen_dir.join(&name);
        img.save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| StoreError::Encode(e.to_string()))?;
        Ok(StoredArtifact {
            url: format!("/gen/{name}"),
            id: name,
            path,
        })
    }

    /// Resolve a generated-artifact handle to its path.
    ///
    /// Ids that are not a single safe path component are rejected before any
    /// filesystem access; a well-formed but absent handle is `NotFound`.
    pub fn resolve_generated(&self, id: &str) -> Result<PathBuf, StoreError> {
        if !valid_id(id) {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        let path = self.gen_dir.join(id);
        if path.is_file() {
            Ok(path)
        } else {
            Err(StoreError::NotFound(id.to_string()))
        }
    }
}

/// A handle is one path component from a known charset, no leading dot.
fn valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
