//! In-process resizing with the `image` crate.

use std::path::Path;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};

use crate::resizer::{Bounds, ResizeRequest, Resizer};

/// Resizer that decodes, orients, scales and re-encodes images in process.
///
/// Work runs on tokio's blocking pool. The output format follows the
/// destination extension, falling back to the source format.
#[derive(Debug, Clone)]
pub struct NativeResizer {
    filter: FilterType,
}

impl Default for NativeResizer {
    fn default() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }
}

impl NativeResizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different resampling filter (e.g. `Triangle` for speed).
    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }
}

#[async_trait]
impl Resizer for NativeResizer {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn resize(&self, request: &ResizeRequest) -> iv_core::Result<()> {
        let request = request.clone();
        let filter = self.filter;
        tokio::task::spawn_blocking(move || resize_file(&request, filter))
            .await
            .map_err(|e| iv_core::Error::Internal(format!("resize task panicked: {e}")))?
    }
}

fn resize_file(request: &ResizeRequest, filter: FilterType) -> iv_core::Result<()> {
    let src = &request.src;
    let reader = ImageReader::open(src)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| iv_core::Error::image(format!("{}: {e}", src.display())))?;
    let source_format = reader.format();

    let mut decoder = reader
        .into_decoder()
        .map_err(|e| iv_core::Error::image(format!("{}: {e}", src.display())))?;
    let orientation = if request.auto_orient {
        decoder.orientation().unwrap_or(Orientation::NoTransforms)
    } else {
        Orientation::NoTransforms
    };
    let mut img = DynamicImage::from_decoder(decoder)
        .map_err(|e| iv_core::Error::image(format!("{}: {e}", src.display())))?;
    img.apply_orientation(orientation);

    let img = scale(img, request.bounds, filter);

    let format = ImageFormat::from_path(&request.dst)
        .ok()
        .or(source_format)
        .ok_or_else(|| {
            iv_core::Error::image(format!(
                "cannot determine output format for {}",
                request.dst.display()
            ))
        })?;

    write(img, &request.dst, format)
}

fn scale(img: DynamicImage, bounds: Bounds, filter: FilterType) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    let (w, h) = bounds.fit(width, height);
    if (w, h) == (width, height) {
        img
    } else {
        img.resize_exact(w, h, filter)
    }
}

fn write(img: DynamicImage, dst: &Path, format: ImageFormat) -> iv_core::Result<()> {
    // JPEG has no alpha channel.
    let img = if format == ImageFormat::Jpeg && img.color().has_alpha() {
        DynamicImage::ImageRgb8(img.to_rgb8())
    } else {
        img
    };

    img.save_with_format(dst, format)
        .map_err(|e| iv_core::Error::image(format!("{}: {e}", dst.display())))
}
