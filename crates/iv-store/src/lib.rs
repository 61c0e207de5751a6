//! iv-store: the imagevault save pipeline.
//!
//! A save runs through these steps in order:
//!
//! 1. [`partition`]: pick `{root}/{YYYY}/{MM}` for today.
//! 2. [`placer::create_directories`]: create it and its `thumbnails/` child.
//! 3. [`placer::stage_upload`]: copy the upload into a hidden staging file.
//! 4. [`naming`]: publish it under a unique name with an exclusive hard
//!    link, then [`placer::finish`] drops the staging name and the temp file.
//! 5. [`derivatives`]: thumbnail and display variant, concurrently.
//! 6. [`url`]: map the stored path to its public URL.
//!
//! [`LocalImageStore`] ties the steps together.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use iv_resize::NativeResizer;
//! use iv_store::{LocalImageStore, StoreSettings};
//!
//! # async fn example() -> iv_core::Result<()> {
//! let settings = StoreSettings::new("/srv/content/images")
//!     .with_app_root("/srv")
//!     .with_subdir_prefix("/blog");
//! let store = LocalImageStore::new(settings, Arc::new(NativeResizer::new()))?;
//! let outcome = store.save_file("/tmp/upload123", "photo.jpg").await?;
//! println!("{}", outcome.url); // /blog/content/images/2024/03/photo.jpg
//! # Ok(())
//! # }
//! ```

pub mod derivatives;
pub mod naming;
pub mod outcome;
pub mod partition;
pub mod placer;
pub mod store;
pub mod url;

pub use derivatives::{DerivativeFailure, DerivativeGenerator};
pub use outcome::{
    DerivativeKind, SaveOutcome, SaveStage, SaveStatus, SaveWarning, StoredAsset, UploadedImage,
};
pub use partition::{DateSource, Partition};
pub use placer::{AssetFs, LocalFs, THUMBNAIL_DIR};
pub use store::{LocalImageStore, StoreSettings};
pub use url::to_public_url;
