//! Unified error type for imagevault.
//!
//! Every fallible library operation funnels into [`Error`], which carries
//! enough context for HTTP handlers to derive a status code via
//! [`Error::http_status`].

use std::fmt;
use std::path::PathBuf;

/// Unified error type covering the failure modes of the save pipeline and
/// its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A target or thumbnail directory could not be created.
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreate {
        /// Directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Reserving the final name or copying the upload into it failed.
    #[error("Failed to place asset at {}: {source}", path.display())]
    Placement {
        /// Destination path of the asset.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Every candidate filename was already taken.
    #[error("No free filename for '{name}' in {} after {attempts} attempts", dir.display())]
    NameSpaceExhausted {
        /// Directory that was searched.
        dir: PathBuf,
        /// Sanitized name the allocator started from.
        name: String,
        /// Number of candidates tried.
        attempts: u32,
    },

    /// A stored path does not live under the configured application root.
    #[error("Path {} is not under application root {}", path.display(), app_root.display())]
    OutsideAppRoot {
        /// The offending path.
        path: PathBuf,
        /// The configured application root.
        app_root: PathBuf,
    },

    /// An external tool (ImageMagick) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Decoding, transforming or encoding an image failed.
    #[error("Image error: {0}")]
    Image(String),

    /// Request data or configuration failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::DirectoryCreate { .. } => 500,
            Error::Placement { .. } => 500,
            Error::NameSpaceExhausted { .. } => 409,
            Error::OutsideAppRoot { .. } => 500,
            Error::Tool { .. } => 502,
            Error::Image(_) => 422,
            Error::Validation(_) => 400,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::DirectoryCreate { .. } => "directory_create_error",
            Error::Placement { .. } => "placement_error",
            Error::NameSpaceExhausted { .. } => "name_space_exhausted",
            Error::OutsideAppRoot { .. } => "outside_app_root",
            Error::Tool { .. } => "tool_error",
            Error::Image(_) => "image_error",
            Error::Validation(_) => "validation_error",
            Error::Io { .. } => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Image`].
    pub fn image(message: impl fmt::Display) -> Self {
        Error::Image(message.to_string())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
