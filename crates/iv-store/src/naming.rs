//! Collision-free filenames inside a target directory.
//!
//! A name is claimed by hard-linking a fully written staging file to it.
//! Linking fails when the name exists, so the "is it free" check and the
//! claim are a single filesystem operation, and the name never points at a
//! partially written file. Concurrent savers racing for `photo.jpg` each end
//! up with a different file.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use iv_core::{Error, Result};

/// Candidates tried before giving up.
pub const MAX_ATTEMPTS: u32 = 1000;

/// Stem used when the upload's name has no usable characters.
const FALLBACK_STEM: &str = "image";

/// An upload filename reduced to a safe stem and extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedName {
    stem: String,
    /// Includes the leading dot, or is empty.
    extension: String,
}

impl SanitizedName {
    /// Strip any directory part, replace every non-word character of the
    /// stem with `-`, and keep an alphanumeric extension.
    pub fn new(original: &str) -> Self {
        let base = original.rsplit(['/', '\\']).next().unwrap_or_default();

        let (stem, extension) = match base.rfind('.') {
            Some(idx) if idx > 0 => (&base[..idx], &base[idx + 1..]),
            _ => (base, ""),
        };

        let stem: String = stem
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '-' })
            .collect();
        let stem = if stem.is_empty() {
            FALLBACK_STEM.to_string()
        } else {
            stem
        };

        let extension: String = extension
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();
        let extension = if extension.is_empty() {
            String::new()
        } else {
            format!(".{extension}")
        };

        Self { stem, extension }
    }

    /// The `attempt`-th candidate: `stem.ext`, then `stem-1.ext`, ...
    pub fn candidate(&self, attempt: u32) -> String {
        if attempt == 0 {
            format!("{}{}", self.stem, self.extension)
        } else {
            format!("{}-{}{}", self.stem, attempt, self.extension)
        }
    }
}

impl fmt::Display for SanitizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.stem, self.extension)
    }
}

/// A filename claimed in a target directory. The file already holds the
/// complete upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub filename: String,
    pub path: PathBuf,
}

/// Publish `staged` under a unique name for `desired_name` in `target_dir`.
///
/// `staged` must live on the same filesystem as `target_dir`; it is left in
/// place and the caller removes it.
pub async fn allocate(desired_name: &str, target_dir: &Path, staged: &Path) -> Result<Reservation> {
    allocate_with_limit(desired_name, target_dir, staged, MAX_ATTEMPTS).await
}

/// [`allocate`] with a custom attempt limit.
pub async fn allocate_with_limit(
    desired_name: &str,
    target_dir: &Path,
    staged: &Path,
    max_attempts: u32,
) -> Result<Reservation> {
    let name = SanitizedName::new(desired_name);

    for attempt in 0..max_attempts {
        let filename = name.candidate(attempt);
        let path = target_dir.join(&filename);

        match tokio::fs::hard_link(staged, &path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), attempt, "claimed filename");
                return Ok(Reservation { filename, path });
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(source) => return Err(Error::Placement { path, source }),
        }
    }

    Err(Error::NameSpaceExhausted {
        dir: target_dir.to_path_buf(),
        name: name.to_string(),
        attempts: max_attempts,
    })
}
