//! Directory creation and placement of uploaded files.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use iv_core::{Error, Result};

use crate::outcome::SaveWarning;

/// Name of the per-partition thumbnail directory.
pub const THUMBNAIL_DIR: &str = "thumbnails";

/// The file operations the placer performs.
///
/// [`LocalFs`] is the real implementation; tests wrap it to inject failures.
#[async_trait]
pub trait AssetFs: Send + Sync {
    /// Copy `from` over `to`, returning the number of bytes copied.
    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;

    /// Delete the file at `path`.
    async fn remove(&self, path: &Path) -> io::Result<()>;
}

/// [`AssetFs`] backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

#[async_trait]
impl AssetFs for LocalFs {
    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        tokio::fs::copy(from, to).await
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}

/// Create `target_dir` and its thumbnail directory, returning the latter.
///
/// Idempotent: existing directories are not an error.
pub async fn create_directories(target_dir: &Path) -> Result<PathBuf> {
    let thumbnail_dir = target_dir.join(THUMBNAIL_DIR);

    for dir in [target_dir, thumbnail_dir.as_path()] {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| Error::DirectoryCreate {
                path: dir.to_path_buf(),
                source,
            })?;
    }

    Ok(thumbnail_dir)
}

/// An upload copied into a hidden file beside its final location.
#[derive(Debug)]
pub struct Staged {
    pub path: PathBuf,
    /// Bytes copied from the temporary upload.
    pub bytes: u64,
}

/// Copy `temp_path` into a hidden staging sibling of `final_path`.
///
/// Nothing is visible under a public name yet. A failed copy removes the
/// staging file and is fatal.
pub async fn stage_upload(fs: &dyn AssetFs, temp_path: &Path, final_path: &Path) -> Result<Staged> {
    let path = staging_path(final_path);

    match fs.copy(temp_path, &path).await {
        Ok(bytes) => {
            tracing::debug!(path = %path.display(), bytes, "staged upload");
            Ok(Staged { path, bytes })
        }
        Err(source) => {
            discard(fs, &path).await;
            Err(Error::Placement { path, source })
        }
    }
}

/// Remove a staging file; one that is already gone is fine.
pub async fn discard(fs: &dyn AssetFs, staged_path: &Path) {
    match fs.remove(staged_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %staged_path.display(),
            error = %e,
            "failed to remove staging file"
        ),
    }
}

/// Drop the staging name of a published asset and delete the temporary
/// upload.
///
/// Neither failure affects the stored asset. A temp file that cannot be
/// deleted is reported as a [`SaveWarning::Cleanup`].
pub async fn finish(fs: &dyn AssetFs, staged: &Staged, temp_path: &Path) -> Option<SaveWarning> {
    discard(fs, &staged.path).await;

    match fs.remove(temp_path).await {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!(
                path = %temp_path.display(),
                error = %e,
                "failed to delete temporary upload"
            );
            Some(SaveWarning::Cleanup {
                path: temp_path.to_path_buf(),
                message: e.to_string(),
            })
        }
    }
}

/// Hidden sibling of `final_path` with the same extension. Allocated names
/// never start with a dot, so this cannot collide with a stored asset.
pub(crate) fn staging_path(final_path: &Path) -> PathBuf {
    let filename = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    final_path.with_file_name(format!(".{}-{}", uuid::Uuid::new_v4().simple(), filename))
}
