//! Resizing through the ImageMagick command line.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::command::{ToolCommand, DEFAULT_TIMEOUT};
use crate::resizer::{ResizeRequest, Resizer};
use crate::tools::locate_magick;

/// Resizer that shells out to `magick` / `convert`.
///
/// Equivalent to `convert SRC -auto-orient -resize WxH> DST`.
#[derive(Debug, Clone)]
pub struct MagickResizer {
    program: PathBuf,
    timeout: Duration,
}

impl MagickResizer {
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Find ImageMagick at `custom` or on `PATH`.
    pub fn discover(custom: Option<&Path>) -> iv_core::Result<Self> {
        locate_magick(custom).map(Self::new).ok_or_else(|| {
            iv_core::Error::tool(
                "imagemagick",
                "neither magick nor convert found; is ImageMagick installed and in PATH?",
            )
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, request: &ResizeRequest) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.program.clone());
        cmd.arg(&request.src);
        if request.auto_orient {
            cmd.arg("-auto-orient");
        }
        cmd.arg("-resize")
            .arg(request.bounds.geometry())
            .arg(&request.dst)
            .timeout(self.timeout);
        cmd
    }
}

#[async_trait]
impl Resizer for MagickResizer {
    fn name(&self) -> &'static str {
        "imagemagick"
    }

    async fn resize(&self, request: &ResizeRequest) -> iv_core::Result<()> {
        self.command(request).execute().await.map(|output| {
            if !output.stderr.trim().is_empty() {
                tracing::debug!(stderr = %output.stderr.trim(), "imagemagick warnings");
            }
        })
    }
}
