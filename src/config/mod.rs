mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./config.toml",
        "./imagevault.toml",
        "~/.config/imagevault/config.toml",
        "/etc/imagevault/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    let images = &config.images;

    let base_url = images.base_url.trim_end_matches('/');
    if !images.base_url.starts_with('/') || base_url.is_empty() {
        anyhow::bail!(
            "images.base_url must be a non-root path starting with '/', got {:?}",
            images.base_url
        );
    }

    for (name, bounds) in [("thumbnail", images.thumbnail), ("display", images.display)] {
        if bounds.width == 0 || bounds.height == 0 {
            anyhow::bail!(
                "images.{} bounds must be non-zero, got {}x{}",
                name,
                bounds.width,
                bounds.height
            );
        }
    }

    if images.max_upload_mb == 0 {
        anyhow::bail!("images.max_upload_mb cannot be 0");
    }

    let root = images.resolved_root();
    let app_root = images.resolved_app_root();
    let Ok(relative) = root.strip_prefix(&app_root) else {
        anyhow::bail!(
            "images.root {:?} is not inside images.app_root {:?}",
            root,
            app_root
        );
    };

    // Public URLs only resolve when they land on the mount point.
    let url_base = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .fold(images.subdir.trim_end_matches('/').to_string(), |acc, seg| {
            format!("{}/{}", acc, seg)
        });
    if url_base != base_url {
        tracing::warn!(
            "Public URLs start with {:?} but images are served under {:?}",
            url_base,
            base_url
        );
    }

    if !root.exists() {
        tracing::warn!("Images root does not exist yet and will be created: {:?}", root);
    }

    Ok(())
}
