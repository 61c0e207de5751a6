//! Discovery of the ImageMagick executable.
//!
//! ImageMagick 7 ships a single `magick` binary; version 6 installs
//! `convert`. Either accepts the same resize arguments, so the first one
//! found wins.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Executable names tried in order.
const MAGICK_CANDIDATES: &[&str] = &["magick", "convert"];

/// Availability information for a tool, returned by [`check_tools`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `-version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Locate ImageMagick.
///
/// A configured `custom` path is used when it exists; otherwise `PATH` is
/// searched with [`which::which`].
pub fn locate_magick(custom: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = custom {
        if p.exists() {
            return Some(p.to_path_buf());
        }
        tracing::warn!(path = %p.display(), "configured ImageMagick path does not exist; searching PATH");
    }

    MAGICK_CANDIDATES
        .iter()
        .find_map(|name| which::which(name).ok())
}

/// Report on every ImageMagick candidate for the `check-tools` command.
pub fn check_tools(custom: Option<&Path>) -> Vec<ToolInfo> {
    let mut infos: Vec<ToolInfo> = MAGICK_CANDIDATES
        .iter()
        .map(|&name| match which::which(name) {
            Ok(path) => ToolInfo {
                name: name.to_string(),
                available: true,
                version: detect_version(&path),
                path: Some(path),
            },
            Err(_) => ToolInfo {
                name: name.to_string(),
                available: false,
                version: None,
                path: None,
            },
        })
        .collect();

    if let Some(p) = custom {
        infos.insert(
            0,
            ToolInfo {
                name: "configured".to_string(),
                available: p.exists(),
                version: p.exists().then(|| detect_version(p)).flatten(),
                path: Some(p.to_path_buf()),
            },
        );
    }

    infos
}

/// Run `<tool> -version` and return the first line of stdout.
fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}
