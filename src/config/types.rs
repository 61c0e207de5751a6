use anyhow::{Context, Result};
use iv_resize::{Bounds, MagickResizer, NativeResizer, Resizer, DISPLAY_BOUNDS, THUMBNAIL_BOUNDS};
use iv_store::{DateSource, Partition, StoreSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub images: ImageConfig,

    #[serde(default)]
    pub resize: ResizeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allow cross-origin requests from any origin
    #[serde(default = "default_true")]
    pub cors: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    2368
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors: true,
        }
    }
}

/// Which calendar the date partitions follow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Clock {
    #[default]
    Local,
    Utc,
}

impl From<Clock> for DateSource {
    fn from(clock: Clock) -> Self {
        match clock {
            Clock::Local => DateSource::Local,
            Clock::Utc => DateSource::Utc,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageConfig {
    /// Directory holding the date partitions
    #[serde(default = "default_images_root")]
    pub root: PathBuf,

    /// Base directory public URLs are computed from (default: `root`)
    #[serde(default)]
    pub app_root: Option<PathBuf>,

    /// Prefix of every public URL
    #[serde(default = "default_base_url")]
    pub subdir: String,

    /// Path the images are served under
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub partition: Partition,

    #[serde(default)]
    pub clock: Clock,

    /// Where uploads are spooled before being saved (default: system temp dir)
    #[serde(default)]
    pub upload_dir: Option<PathBuf>,

    #[serde(default = "default_thumbnail")]
    pub thumbnail: Bounds,

    #[serde(default = "default_display")]
    pub display: Bounds,

    /// Rotate according to EXIF orientation before resizing
    #[serde(default = "default_true")]
    pub auto_orient: bool,

    /// Largest accepted upload body, in megabytes
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

fn default_images_root() -> PathBuf {
    PathBuf::from("content/images")
}
fn default_base_url() -> String {
    "/content/images".to_string()
}
fn default_thumbnail() -> Bounds {
    THUMBNAIL_BOUNDS
}
fn default_display() -> Bounds {
    DISPLAY_BOUNDS
}
fn default_max_upload_mb() -> usize {
    25
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            root: default_images_root(),
            app_root: None,
            subdir: default_base_url(),
            base_url: default_base_url(),
            partition: Partition::default(),
            clock: Clock::default(),
            upload_dir: None,
            thumbnail: THUMBNAIL_BOUNDS,
            display: DISPLAY_BOUNDS,
            auto_orient: true,
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl ImageConfig {
    /// Images root with `~` expanded.
    pub fn resolved_root(&self) -> PathBuf {
        expand(&self.root)
    }

    /// App root with `~` expanded, falling back to the images root.
    pub fn resolved_app_root(&self) -> PathBuf {
        self.app_root
            .as_deref()
            .map(expand)
            .unwrap_or_else(|| self.resolved_root())
    }

    pub fn resolved_upload_dir(&self) -> PathBuf {
        self.upload_dir
            .as_deref()
            .map(expand)
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    pub fn store_settings(&self) -> StoreSettings {
        let mut settings = StoreSettings::new(self.resolved_root())
            .with_app_root(self.resolved_app_root())
            .with_subdir_prefix(self.subdir.clone())
            .with_partition(self.partition)
            .with_date_source(self.clock.into());
        settings.thumbnail_bounds = self.thumbnail;
        settings.display_bounds = self.display;
        settings.auto_orient = self.auto_orient;
        settings
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeBackend {
    /// Pure-Rust decoding and resampling
    #[default]
    Native,
    /// ImageMagick `magick`/`convert` subprocess
    Imagemagick,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResizeConfig {
    #[serde(default)]
    pub backend: ResizeBackend,

    /// Explicit path to the ImageMagick binary
    #[serde(default)]
    pub convert_path: Option<PathBuf>,

    #[serde(default = "default_resize_timeout")]
    pub timeout_secs: u64,
}

fn default_resize_timeout() -> u64 {
    120
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            backend: ResizeBackend::Native,
            convert_path: None,
            timeout_secs: default_resize_timeout(),
        }
    }
}

impl ResizeConfig {
    /// Build the resizer for the configured backend.
    pub fn build_resizer(&self) -> Result<Arc<dyn Resizer>> {
        match self.backend {
            ResizeBackend::Native => Ok(Arc::new(NativeResizer::new())),
            ResizeBackend::Imagemagick => {
                let magick = MagickResizer::discover(self.convert_path.as_deref())
                    .context("ImageMagick backend selected but no binary was found")?
                    .with_timeout(Duration::from_secs(self.timeout_secs));
                tracing::info!("Using ImageMagick at {:?}", magick.program());
                Ok(Arc::new(magick))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_serve_where_urls_point() {
        let images = ImageConfig::default();
        assert_eq!(images.subdir, images.base_url);
        assert_eq!(images.resolved_app_root(), images.resolved_root());
    }

    #[test]
    fn parses_full_config() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9000
            cors = false

            [images]
            root = "/srv/blog/content/images"
            app_root = "/srv/blog"
            subdir = "/blog"
            partition = "day"
            clock = "utc"
            thumbnail = { width = 200, height = 100 }

            [resize]
            backend = "imagemagick"
            timeout_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert!(!config.server.cors);
        assert_eq!(config.images.partition, Partition::Day);
        assert_eq!(config.images.clock, Clock::Utc);
        assert_eq!(config.images.thumbnail, Bounds::new(200, 100));
        assert_eq!(config.images.display, DISPLAY_BOUNDS);
        assert_eq!(config.resize.backend, ResizeBackend::Imagemagick);

        let settings = config.images.store_settings();
        assert_eq!(settings.app_root, PathBuf::from("/srv/blog"));
        assert_eq!(settings.subdir_prefix, "/blog");
        assert_eq!(settings.date_source, DateSource::Utc);
        assert_eq!(settings.thumbnail_bounds, Bounds::new(200, 100));
    }

    #[test]
    fn native_backend_needs_no_tools() {
        let resizer = ResizeConfig::default().build_resizer().unwrap();
        assert_eq!(resizer.name(), "native");
    }
}
