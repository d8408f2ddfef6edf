//! Uploaded media files attached to slides.

mod content_type;
mod export;

pub use content_type::AssetMime;
pub use export::{ExportView, Exportable};

use crate::{config::Limits, errors::ApiError};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use uuid::Uuid;

/// A file handed over by the upload transport.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Temporary location of the uploaded bytes.
    pub tmp_path: PathBuf,
    /// Name the client gave the file.
    pub name: String,
}

/// An uploaded image or video stored under a generated name.
///
/// A default value is unbound: it owns no file until populated through
/// [`Exportable::import`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlideAsset {
    mime: Option<AssetMime>,
    filename: String,
    uid: String,
    internal_name: String,
    full_path: Option<PathBuf>,
}

impl SlideAsset {
    /// Validate `upload` and move it into `asset_dir` as `<uid>.<subtype>`.
    ///
    /// The MIME type is sniffed from the file content. On failure the
    /// temporary file is left where it was.
    pub fn create(upload: &UploadFile, asset_dir: &Path, limits: &Limits) -> Result<Self, ApiError> {
        debug_assert!(!asset_dir.as_os_str().is_empty());

        let detected = content_type::sniff(&upload.tmp_path).unwrap_or_else(|e| {
            tracing::warn!("Could not read upload {}: {e}", upload.tmp_path.display());
            None
        });
        let mime = match detected.map(str::parse::<AssetMime>) {
            Some(Ok(mime)) => mime,
            _ => {
                tracing::warn!(
                    "Rejected asset '{}' with MIME type {:?}",
                    upload.name,
                    detected
                );
                return Err(ApiError::invalid("Invalid asset MIME type"));
            }
        };

        if upload.name.len() > limits.slide_asset_name_max_len {
            tracing::warn!(
                "Rejected asset name of {} bytes (max {})",
                upload.name.len(),
                limits.slide_asset_name_max_len
            );
            return Err(ApiError::invalid("Asset filename too long"));
        }

        let filename = base_name(&upload.name);
        if filename.is_empty() {
            return Err(ApiError::invalid("Asset filename missing"));
        }

        let uid = Uuid::new_v4().to_string();
        let internal_name = format!("{uid}.{}", mime.subtype());
        let full_path = asset_dir.join(&internal_name);

        move_file(&upload.tmp_path, &full_path).map_err(|e| {
            tracing::error!(
                "Could not move {} to {}: {e}",
                upload.tmp_path.display(),
                full_path.display()
            );
            ApiError::internal("Failed to store uploaded asset")
        })?;
        tracing::info!("Stored asset '{filename}' as {internal_name}");

        Ok(Self {
            mime: Some(mime),
            filename: filename.to_string(),
            uid,
            internal_name,
            full_path: Some(full_path),
        })
    }

    /// Delete the backing file.
    ///
    /// Does nothing for an unbound asset and treats an already missing file
    /// as removed, so calling this twice is fine.
    pub fn remove(&self) -> Result<(), ApiError> {
        let Some(path) = self
            .full_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
        else {
            return Ok(());
        };

        match fs::remove_file(path) {
            Ok(()) => {
                tracing::info!("Removed asset '{}' ({})", self.filename, path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("Asset file {} already gone", path.display());
                Ok(())
            }
            Err(e) => {
                tracing::error!("Could not remove {}: {e}", path.display());
                Err(ApiError::internal("Failed to remove asset"))
            }
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mime(&self) -> Option<AssetMime> {
        self.mime
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn internal_name(&self) -> &str {
        &self.internal_name
    }

    pub fn full_path(&self) -> Option<&Path> {
        self.full_path.as_deref()
    }
}

/// Last path component of a client supplied name.
fn base_name(name: &str) -> &str {
    let trimmed = name.trim_end_matches(['/', '\\']);
    trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
}

fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => copy_then_remove(from, to),
        res => res,
    }
}

/// Cross-device move. On failure nothing is left at `to`.
fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    let res = fs::copy(from, to).and_then(|_| fs::remove_file(from));
    if res.is_err() {
        match fs::remove_file(to) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::error!("Could not clean up {}: {e}", to.display()),
        }
    }
    res
}
