//! Inputs and results of a save.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// An upload waiting to be stored. The pipeline consumes it and deletes
/// `temporary_path` once the asset is placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub temporary_path: PathBuf,
    /// Name supplied by the client; only used to derive the stored name.
    pub original_filename: String,
    pub mime_type: Option<String>,
}

impl UploadedImage {
    pub fn new(temporary_path: impl Into<PathBuf>, original_filename: impl Into<String>) -> Self {
        Self {
            temporary_path: temporary_path.into(),
            original_filename: original_filename.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Where a saved asset lives on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredAsset {
    pub filename: String,
    pub final_path: PathBuf,
    pub thumbnail_path: PathBuf,
}

/// Which resized copy a derivative is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivativeKind {
    Thumbnail,
    Display,
}

impl fmt::Display for DerivativeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivativeKind::Thumbnail => f.write_str("thumbnail"),
            DerivativeKind::Display => f.write_str("display"),
        }
    }
}

/// Non-fatal problems encountered during a save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SaveWarning {
    /// The temporary upload could not be deleted.
    Cleanup { path: PathBuf, message: String },
    /// A derivative could not be produced.
    Derivative {
        derivative: DerivativeKind,
        message: String,
    },
}

/// Terminal state of a save that produced a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    /// Asset and both derivatives are in place.
    Mapped,
    /// Asset is usable but at least one derivative is missing.
    PartiallyMapped,
}

/// Stages a save passes through, in order. Used for logging where a save
/// failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStage {
    Resolving,
    CreatingDirectories,
    /// Copying the upload into a hidden staging file.
    Placing,
    /// Publishing the staged file under a unique name.
    Allocating,
    GeneratingDerivatives,
    Mapping,
}

impl fmt::Display for SaveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SaveStage::Resolving => "resolving",
            SaveStage::CreatingDirectories => "creating_directories",
            SaveStage::Placing => "placing",
            SaveStage::Allocating => "allocating",
            SaveStage::GeneratingDerivatives => "generating_derivatives",
            SaveStage::Mapping => "mapping",
        };
        f.write_str(s)
    }
}

/// A successful save.
#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    /// Public URL of the stored asset.
    pub url: String,
    pub asset: StoredAsset,
    pub status: SaveStatus,
    pub warnings: Vec<SaveWarning>,
}

impl SaveOutcome {
    pub(crate) fn new(url: String, asset: StoredAsset, warnings: Vec<SaveWarning>) -> Self {
        let status = if warnings
            .iter()
            .any(|w| matches!(w, SaveWarning::Derivative { .. }))
        {
            SaveStatus::PartiallyMapped
        } else {
            SaveStatus::Mapped
        };

        Self {
            url,
            asset,
            status,
            warnings,
        }
    }

    /// True when a derivative is missing.
    pub fn is_partial(&self) -> bool {
        self.status == SaveStatus::PartiallyMapped
    }
}
