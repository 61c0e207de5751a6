//! Public URLs for stored assets.

use std::path::{Component, Path};

use iv_core::{Error, Result};

/// Build the public URL of `final_path`.
///
/// The path relative to `app_root` is joined with `/` regardless of the
/// platform separator and appended to `subdir_prefix`. The result always
/// starts with `subdir_prefix` and never contains a backslash.
pub fn to_public_url(final_path: &Path, app_root: &Path, subdir_prefix: &str) -> Result<String> {
    let relative = final_path
        .strip_prefix(app_root)
        .map_err(|_| Error::OutsideAppRoot {
            path: final_path.to_path_buf(),
            app_root: app_root.to_path_buf(),
        })?;

    let segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().replace('\\', "/")),
            _ => None,
        })
        .collect();

    Ok(format!(
        "{}/{}",
        subdir_prefix.trim_end_matches('/'),
        segments.join("/")
    ))
}
