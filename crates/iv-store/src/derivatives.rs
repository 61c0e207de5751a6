//! Thumbnail and display variants of a placed asset.

use std::path::Path;
use std::sync::Arc;

use iv_resize::{Bounds, ResizeRequest, Resizer, DISPLAY_BOUNDS, THUMBNAIL_BOUNDS};

use crate::outcome::{DerivativeKind, SaveWarning};
use crate::placer::staging_path;

/// A derivative that could not be produced.
#[derive(Debug)]
pub struct DerivativeFailure {
    pub kind: DerivativeKind,
    pub error: iv_core::Error,
}

impl From<DerivativeFailure> for SaveWarning {
    fn from(failure: DerivativeFailure) -> Self {
        SaveWarning::Derivative {
            derivative: failure.kind,
            message: failure.error.to_string(),
        }
    }
}

/// Produces the thumbnail and the display variant of a stored asset.
///
/// The display variant replaces the stored file. It is rendered into a
/// hidden staging file beside the asset and renamed over it only after the
/// thumbnail has finished reading the original.
#[derive(Clone)]
pub struct DerivativeGenerator {
    resizer: Arc<dyn Resizer>,
    thumbnail: Bounds,
    display: Bounds,
    auto_orient: bool,
}

impl DerivativeGenerator {
    pub fn new(resizer: Arc<dyn Resizer>) -> Self {
        Self {
            resizer,
            thumbnail: THUMBNAIL_BOUNDS,
            display: DISPLAY_BOUNDS,
            auto_orient: true,
        }
    }

    pub fn with_bounds(mut self, thumbnail: Bounds, display: Bounds) -> Self {
        self.thumbnail = thumbnail;
        self.display = display;
        self
    }

    pub fn with_auto_orient(mut self, auto_orient: bool) -> Self {
        self.auto_orient = auto_orient;
        self
    }

    pub fn resizer_name(&self) -> &'static str {
        self.resizer.name()
    }

    fn request(&self, src: &Path, dst: &Path, bounds: Bounds) -> ResizeRequest {
        ResizeRequest {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            bounds,
            auto_orient: self.auto_orient,
        }
    }

    /// Generate both derivatives concurrently and return the failures.
    ///
    /// An empty result means both derivatives are in place.
    pub async fn generate(&self, final_path: &Path, thumbnail_path: &Path) -> Vec<DerivativeFailure> {
        let staging = staging_path(final_path);
        let thumbnail = self.request(final_path, thumbnail_path, self.thumbnail);
        let display = self.request(final_path, &staging, self.display);

        let (thumb_result, display_result) = tokio::join!(
            self.resizer.resize(&thumbnail),
            self.resizer.resize(&display),
        );

        let display_result = match display_result {
            Ok(()) => tokio::fs::rename(&staging, final_path)
                .await
                .map_err(iv_core::Error::from),
            Err(e) => Err(e),
        };
        if display_result.is_err() {
            discard_staging(&staging).await;
        }

        let mut failures = Vec::new();
        for (kind, result) in [
            (DerivativeKind::Thumbnail, thumb_result),
            (DerivativeKind::Display, display_result),
        ] {
            match result {
                Ok(()) => tracing::debug!(derivative = %kind, resizer = self.resizer.name(), "derivative generated"),
                Err(error) => {
                    tracing::warn!(
                        derivative = %kind,
                        path = %final_path.display(),
                        error = %error,
                        "derivative generation failed"
                    );
                    failures.push(DerivativeFailure { kind, error });
                }
            }
        }
        failures
    }
}

async fn discard_staging(staging: &Path) {
    match tokio::fs::remove_file(staging).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %staging.display(), error = %e, "failed to remove staging file"),
    }
}
