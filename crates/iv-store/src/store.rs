//! The save pipeline over a local, date-partitioned directory tree.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use iv_core::{Error, Result};
use iv_resize::{Bounds, Resizer, DISPLAY_BOUNDS, THUMBNAIL_BOUNDS};

use crate::derivatives::DerivativeGenerator;
use crate::naming::{allocate, SanitizedName};
use crate::outcome::{SaveOutcome, SaveStage, SaveWarning, StoredAsset, UploadedImage};
use crate::partition::{resolve_target_dir, DateSource, Partition};
use crate::placer::{create_directories, discard, finish, stage_upload, AssetFs, LocalFs};
use crate::url::to_public_url;

/// Everything the store needs to know about its surroundings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// Directory that holds the date partitions.
    pub images_root: PathBuf,
    /// Base for computing public URLs; must contain `images_root`.
    pub app_root: PathBuf,
    /// Prefix of every public URL.
    pub subdir_prefix: String,
    pub partition: Partition,
    pub date_source: DateSource,
    pub thumbnail_bounds: Bounds,
    pub display_bounds: Bounds,
    pub auto_orient: bool,
}

impl StoreSettings {
    /// Settings rooted at `images_root`, which also serves as the app root.
    pub fn new(images_root: impl Into<PathBuf>) -> Self {
        let images_root = images_root.into();
        Self {
            app_root: images_root.clone(),
            images_root,
            subdir_prefix: String::new(),
            partition: Partition::default(),
            date_source: DateSource::default(),
            thumbnail_bounds: THUMBNAIL_BOUNDS,
            display_bounds: DISPLAY_BOUNDS,
            auto_orient: true,
        }
    }

    pub fn with_app_root(mut self, app_root: impl Into<PathBuf>) -> Self {
        self.app_root = app_root.into();
        self
    }

    pub fn with_subdir_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subdir_prefix = prefix.into();
        self
    }

    pub fn with_partition(mut self, partition: Partition) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_date_source(mut self, date_source: DateSource) -> Self {
        self.date_source = date_source;
        self
    }
}

/// Image store writing originals and derivatives below a local root.
///
/// Cheap to clone; clones share the resizer and filesystem handles.
#[derive(Clone)]
pub struct LocalImageStore {
    settings: Arc<StoreSettings>,
    fs: Arc<dyn AssetFs>,
    derivatives: DerivativeGenerator,
}

impl LocalImageStore {
    /// Create a store.
    ///
    /// # Errors
    ///
    /// [`Error::OutsideAppRoot`] when `images_root` is not inside
    /// `app_root`, since no stored asset could then be given a URL.
    /// [`Error::Validation`] when a derivative bound is zero.
    pub fn new(settings: StoreSettings, resizer: Arc<dyn Resizer>) -> Result<Self> {
        for (name, bounds) in [
            ("thumbnail", settings.thumbnail_bounds),
            ("display", settings.display_bounds),
        ] {
            if bounds.width == 0 || bounds.height == 0 {
                return Err(Error::Validation(format!(
                    "{name} bounds must be non-zero, got {}x{}",
                    bounds.width, bounds.height
                )));
            }
        }

        if !settings.images_root.starts_with(&settings.app_root) {
            return Err(Error::OutsideAppRoot {
                path: settings.images_root.clone(),
                app_root: settings.app_root.clone(),
            });
        }

        let derivatives = DerivativeGenerator::new(resizer)
            .with_bounds(settings.thumbnail_bounds, settings.display_bounds)
            .with_auto_orient(settings.auto_orient);

        Ok(Self {
            settings: Arc::new(settings),
            fs: Arc::new(LocalFs),
            derivatives,
        })
    }

    /// Replace the filesystem used for placement.
    pub fn with_fs(mut self, fs: Arc<dyn AssetFs>) -> Self {
        self.fs = fs;
        self
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn images_root(&self) -> &Path {
        &self.settings.images_root
    }

    /// Directory a save started now would write into.
    pub fn target_dir(&self) -> PathBuf {
        resolve_target_dir(
            &self.settings.images_root,
            self.settings.date_source.today(),
            self.settings.partition,
        )
    }

    /// Store an upload and return its public URL.
    ///
    /// On error nothing has been published: no URL exists and a failed
    /// placement leaves no file behind. Derivative problems do not fail the
    /// save; they are reported in [`SaveOutcome::warnings`].
    pub async fn save(&self, upload: UploadedImage) -> Result<SaveOutcome> {
        let mut stage = SaveStage::Resolving;
        let result = self.run(&upload, &mut stage).await;

        match &result {
            Ok(outcome) => tracing::info!(
                url = %outcome.url,
                status = ?outcome.status,
                warnings = outcome.warnings.len(),
                resizer = self.derivatives.resizer_name(),
                "image saved"
            ),
            Err(e) => tracing::error!(
                stage = %stage,
                file = %upload.original_filename,
                error = %e,
                "image save failed"
            ),
        }

        result
    }

    /// Shorthand for [`save`](Self::save) without a MIME type.
    pub async fn save_file(
        &self,
        temp_path: impl Into<PathBuf>,
        original_filename: impl Into<String>,
    ) -> Result<SaveOutcome> {
        self.save(UploadedImage::new(temp_path, original_filename))
            .await
    }

    async fn run(&self, upload: &UploadedImage, stage: &mut SaveStage) -> Result<SaveOutcome> {
        let target_dir = self.target_dir();
        tracing::debug!(
            file = %upload.original_filename,
            mime = upload.mime_type.as_deref().unwrap_or("unknown"),
            target = %target_dir.display(),
            "saving image"
        );

        *stage = SaveStage::CreatingDirectories;
        let thumbnail_dir = create_directories(&target_dir).await?;

        let final_hint = target_dir.join(SanitizedName::new(&upload.original_filename).to_string());

        *stage = SaveStage::Placing;
        let staged = stage_upload(self.fs.as_ref(), &upload.temporary_path, &final_hint).await?;

        *stage = SaveStage::Allocating;
        let reservation =
            match allocate(&upload.original_filename, &target_dir, &staged.path).await {
                Ok(reservation) => reservation,
                Err(e) => {
                    discard(self.fs.as_ref(), &staged.path).await;
                    return Err(e);
                }
            };

        let mut warnings: Vec<SaveWarning> =
            finish(self.fs.as_ref(), &staged, &upload.temporary_path)
                .await
                .into_iter()
                .collect();

        let asset = StoredAsset {
            thumbnail_path: thumbnail_dir.join(&reservation.filename),
            final_path: reservation.path,
            filename: reservation.filename,
        };

        *stage = SaveStage::GeneratingDerivatives;
        let failures = self
            .derivatives
            .generate(&asset.final_path, &asset.thumbnail_path)
            .await;
        warnings.extend(failures.into_iter().map(SaveWarning::from));

        *stage = SaveStage::Mapping;
        let url = to_public_url(
            &asset.final_path,
            &self.settings.app_root,
            &self.settings.subdir_prefix,
        )?;

        Ok(SaveOutcome::new(url, asset, warnings))
    }

    /// Whether `path` exists. I/O errors count as "does not exist".
    pub async fn exists(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match tokio::fs::try_exists(path).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "existence check failed");
                false
            }
        }
    }

    /// Resolve a `/`-separated path relative to the images root.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for empty paths or paths containing anything
    /// other than plain names (`..`, roots, prefixes).
    pub fn stored_path(&self, relative: &str) -> Result<PathBuf> {
        let relative = Path::new(relative.trim_start_matches('/'));
        if relative.as_os_str().is_empty()
            || !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(Error::Validation(format!(
                "invalid image path: {}",
                relative.display()
            )));
        }
        Ok(self.settings.images_root.join(relative))
    }
}
