//! The narrow resize capability the save pipeline depends on.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Bounding box for the thumbnail derivative.
pub const THUMBNAIL_BOUNDS: Bounds = Bounds::new(480, 320);

/// Bounding box for the display derivative.
pub const DISPLAY_BOUNDS: Bounds = Bounds::new(2048, 1366);

/// A maximum width and height an output image must fit inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions of a `width`×`height` image scaled to fit inside these
    /// bounds with its aspect ratio preserved.
    ///
    /// Images that already fit are returned unchanged; they are never
    /// enlarged. Neither side of the result is ever zero; a zero bound is
    /// treated as one pixel.
    pub fn fit(&self, width: u32, height: u32) -> (u32, u32) {
        let (max_w, max_h) = (self.width.max(1), self.height.max(1));
        if width <= max_w && height <= max_h {
            return (width.max(1), height.max(1));
        }

        let (w, h) = (u64::from(width), u64::from(height));
        let (bw, bh) = (u64::from(max_w), u64::from(max_h));

        if w * bh >= h * bw {
            // Width is the limiting side.
            let scaled = ((h * bw + w / 2) / w).clamp(1, bh);
            (max_w, scaled as u32)
        } else {
            let scaled = ((w * bh + h / 2) / h).clamp(1, bw);
            (scaled as u32, max_h)
        }
    }

    /// ImageMagick geometry that shrinks to fit and never enlarges.
    pub fn geometry(&self) -> String {
        format!("{}x{}>", self.width, self.height)
    }
}

/// One resize operation: read `src`, write a bounded copy to `dst`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeRequest {
    pub src: PathBuf,
    pub dst: PathBuf,
    pub bounds: Bounds,
    /// Rotate/flip according to the EXIF orientation tag before resizing.
    pub auto_orient: bool,
}

impl ResizeRequest {
    pub fn new(src: impl Into<PathBuf>, dst: impl Into<PathBuf>, bounds: Bounds) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            bounds,
            auto_orient: true,
        }
    }
}

/// A backend able to produce a bounded copy of an image file.
///
/// `dst` may equal `src`; implementations must fully read the source before
/// they start writing the destination.
#[async_trait]
pub trait Resizer: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Resize `request.src` into `request.dst`.
    async fn resize(&self, request: &ResizeRequest) -> iv_core::Result<()>;
}
