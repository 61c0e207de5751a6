//! # iv-resize
//!
//! Bounded, orientation-aware image resizing for the imagevault save
//! pipeline.
//!
//! - **[`Resizer`]**: the narrow `resize(src, dst, bounds, auto_orient)`
//!   capability the pipeline calls.
//! - **[`NativeResizer`]**: pure Rust backend built on the `image` crate.
//! - **[`MagickResizer`]**: ImageMagick backend driven through
//!   [`ToolCommand`].
//! - **Tool discovery** ([`tools`]): locate `magick`/`convert`.

pub mod command;
pub mod magick;
pub mod native;
pub mod resizer;
pub mod tools;

pub use command::{ToolCommand, ToolOutput};
pub use magick::MagickResizer;
pub use native::NativeResizer;
pub use resizer::{Bounds, ResizeRequest, Resizer, DISPLAY_BOUNDS, THUMBNAIL_BOUNDS};
pub use tools::ToolInfo;
