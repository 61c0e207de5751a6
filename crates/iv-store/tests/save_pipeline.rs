//! End-to-end tests of the save pipeline against real files.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use image::ImageFormat;
use iv_resize::{NativeResizer, ResizeRequest, Resizer};
use iv_store::{
    AssetFs, DateSource, DerivativeKind, LocalFs, LocalImageStore, Partition, SaveStatus,
    SaveWarning, StoreSettings,
};

fn march_15() -> DateSource {
    DateSource::Fixed(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
}

fn settings(root: &Path) -> StoreSettings {
    StoreSettings::new(root)
        .with_subdir_prefix("/content/images")
        .with_date_source(march_15())
}

fn native_store(root: &Path) -> LocalImageStore {
    LocalImageStore::new(settings(root), Arc::new(NativeResizer::new())).unwrap()
}

/// Write a `width`×`height` JPEG into `dir` and return its path.
fn jpeg_upload(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 255) as u8, (y % 255) as u8, 90])
    });
    img.save_with_format(&path, ImageFormat::Jpeg).unwrap();
    path
}

/// Upload written with a `.tmp` name, the way upload layers spool files.
fn spooled_upload(dir: &Path, width: u32, height: u32) -> PathBuf {
    let jpeg = jpeg_upload(dir, &format!("{}.jpg", next_upload_name()), width, height);
    let spooled = jpeg.with_extension("tmp");
    std::fs::rename(&jpeg, &spooled).unwrap();
    spooled
}

fn next_upload_name() -> String {
    use std::sync::atomic::AtomicU32;
    static NEXT: AtomicU32 = AtomicU32::new(0);
    format!("upload{}", NEXT.fetch_add(1, Ordering::Relaxed))
}

#[tokio::test]
async fn first_save_lands_in_month_partition() {
    let root = tempfile::tempdir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let upload = jpeg_upload(tmp.path(), "upload123.jpg", 640, 480);

    let outcome = native_store(root.path())
        .save_file(&upload, "photo.jpg")
        .await
        .unwrap();

    assert_eq!(outcome.url, "/content/images/2024/03/photo.jpg");
    assert_eq!(outcome.status, SaveStatus::Mapped);
    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.asset.final_path, root.path().join("2024/03/photo.jpg"));
    assert_eq!(
        outcome.asset.thumbnail_path,
        root.path().join("2024/03/thumbnails/photo.jpg")
    );
    assert!(outcome.asset.final_path.is_file());
    assert!(outcome.asset.thumbnail_path.is_file());
    assert!(!upload.exists(), "temporary upload must be deleted");
}

#[tokio::test]
async fn second_save_with_same_name_gets_suffix() {
    let root = tempfile::tempdir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let store = native_store(root.path());

    let first = store
        .save_file(jpeg_upload(tmp.path(), "a.jpg", 100, 100), "photo.jpg")
        .await
        .unwrap();
    let second = store
        .save_file(jpeg_upload(tmp.path(), "b.jpg", 120, 90), "photo.jpg")
        .await
        .unwrap();

    assert_eq!(first.url, "/content/images/2024/03/photo.jpg");
    assert_eq!(second.url, "/content/images/2024/03/photo-1.jpg");
    assert_eq!(second.asset.filename, "photo-1.jpg");
    assert!(root.path().join("2024/03/thumbnails/photo-1.jpg").is_file());

    let first_img = image::open(&first.asset.final_path).unwrap();
    assert_eq!((first_img.width(), first_img.height()), (100, 100));
}

#[tokio::test]
async fn day_partition_and_app_root_prefix() {
    let app = tempfile::tempdir().unwrap();
    let images = app.path().join("content").join("images");
    let tmp = tempfile::tempdir().unwrap();

    let settings = StoreSettings::new(&images)
        .with_app_root(app.path())
        .with_subdir_prefix("/blog")
        .with_partition(Partition::Day)
        .with_date_source(march_15());
    let store = LocalImageStore::new(settings, Arc::new(NativeResizer::new())).unwrap();

    let outcome = store
        .save_file(jpeg_upload(tmp.path(), "u.jpg", 50, 50), "My Photo!.jpg")
        .await
        .unwrap();

    assert_eq!(outcome.url, "/blog/content/images/2024/03/15/My-Photo-.jpg");
    assert!(!outcome.url.contains('\\'));
}

#[tokio::test]
async fn derivatives_respect_bounds_and_aspect_ratio() {
    let root = tempfile::tempdir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let upload = jpeg_upload(tmp.path(), "big.jpg", 3000, 2000);

    let outcome = native_store(root.path())
        .save_file(&upload, "big.jpg")
        .await
        .unwrap();
    assert_eq!(outcome.status, SaveStatus::Mapped);

    let thumb = image::open(&outcome.asset.thumbnail_path).unwrap();
    assert!(thumb.width() <= 480 && thumb.height() <= 320);
    assert_eq!((thumb.width(), thumb.height()), (480, 320));

    let display = image::open(&outcome.asset.final_path).unwrap();
    assert!(display.width() <= 2048 && display.height() <= 1366);
    assert_eq!((display.width(), display.height()), (2048, 1365));

    let leftovers: Vec<_> = std::fs::read_dir(root.path().join("2024/03"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with('.'))
        .collect();
    assert!(leftovers.is_empty(), "staging files left behind: {leftovers:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_saves_never_overwrite() {
    let root = tempfile::tempdir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let store = native_store(root.path());

    let uploads: Vec<PathBuf> = (0..12).map(|_| spooled_upload(tmp.path(), 64, 48)).collect();

    let mut tasks = tokio::task::JoinSet::new();
    for upload in uploads.clone() {
        let store = store.clone();
        tasks.spawn(async move { store.save_file(upload, "photo.jpg").await });
    }

    let mut urls = HashSet::new();
    while let Some(result) = tasks.join_next().await {
        let outcome = result.unwrap().unwrap();
        assert!(outcome.url.starts_with("/content/images/2024/03/photo"));
        assert!(urls.insert(outcome.url));
    }

    assert_eq!(urls.len(), 12);
    let stored = std::fs::read_dir(root.path().join("2024/03"))
        .unwrap()
        .filter(|e| e.as_ref().unwrap().path().is_file())
        .count();
    assert_eq!(stored, 12);
    assert!(uploads.iter().all(|u| !u.exists()));
}

/// Copies like [`LocalFs`] but cannot delete.
struct UndeletableTemp;

#[async_trait]
impl AssetFs for UndeletableTemp {
    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        LocalFs.copy(from, to).await
    }

    async fn remove(&self, _path: &Path) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "temp file is locked"))
    }
}

#[tokio::test]
async fn cleanup_failure_still_succeeds_with_warning() {
    let root = tempfile::tempdir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let upload = jpeg_upload(tmp.path(), "locked.jpg", 80, 60);

    let store = native_store(root.path()).with_fs(Arc::new(UndeletableTemp));
    let outcome = store.save_file(&upload, "photo.jpg").await.unwrap();

    assert_eq!(outcome.status, SaveStatus::Mapped);
    assert_eq!(outcome.url, "/content/images/2024/03/photo.jpg");
    assert_eq!(outcome.warnings.len(), 1);
    assert!(matches!(
        &outcome.warnings[0],
        SaveWarning::Cleanup { path, .. } if path == &upload
    ));
    assert!(upload.exists());
}

#[tokio::test]
async fn undecodable_upload_is_partially_mapped() {
    let root = tempfile::tempdir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let upload = tmp.path().join("garbage");
    std::fs::write(&upload, b"this is not an image").unwrap();

    let outcome = native_store(root.path())
        .save_file(&upload, "photo.jpg")
        .await
        .unwrap();

    assert_eq!(outcome.status, SaveStatus::PartiallyMapped);
    assert_eq!(outcome.url, "/content/images/2024/03/photo.jpg");
    let kinds: Vec<DerivativeKind> = outcome
        .warnings
        .iter()
        .filter_map(|w| match w {
            SaveWarning::Derivative { derivative, .. } => Some(*derivative),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec![DerivativeKind::Thumbnail, DerivativeKind::Display]);
    assert_eq!(
        std::fs::read(&outcome.asset.final_path).unwrap(),
        b"this is not an image"
    );
}

/// Writes half the upload, stalls, then writes the rest.
struct SlowCopy;

#[async_trait]
impl AssetFs for SlowCopy {
    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        use tokio::io::AsyncWriteExt;

        let bytes = tokio::fs::read(from).await?;
        let (head, tail) = bytes.split_at(bytes.len() / 2);
        let mut file = tokio::fs::File::create(to).await?;
        file.write_all(head).await?;
        file.flush().await?;
        tokio::time::sleep(Duration::from_millis(300)).await;
        file.write_all(tail).await?;
        file.flush().await?;
        Ok(bytes.len() as u64)
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        LocalFs.remove(path).await
    }
}

/// Derivatives identical to their source, so the stored bytes never change.
struct CopyResizer;

#[async_trait]
impl Resizer for CopyResizer {
    fn name(&self) -> &'static str {
        "copy"
    }

    async fn resize(&self, request: &ResizeRequest) -> iv_core::Result<()> {
        tokio::fs::copy(&request.src, &request.dst).await?;
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn public_path_only_ever_holds_complete_upload() {
    let root = tempfile::tempdir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let upload = jpeg_upload(tmp.path(), "slow.jpg", 64, 64);
    let expected = std::fs::read(&upload).unwrap();
    let final_path = root.path().join("2024/03/photo.jpg");

    let store = LocalImageStore::new(settings(root.path()), Arc::new(CopyResizer))
        .unwrap()
        .with_fs(Arc::new(SlowCopy));
    let done = Arc::new(AtomicBool::new(false));

    let watcher = {
        let done = Arc::clone(&done);
        let final_path = final_path.clone();
        let expected = expected.clone();
        tokio::spawn(async move {
            let mut observed = 0;
            while !done.load(Ordering::Acquire) {
                if let Ok(content) = tokio::fs::read(&final_path).await {
                    assert_eq!(content, expected, "public path exposed a partial file");
                    observed += 1;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            observed
        })
    };

    let outcome = store.save_file(&upload, "photo.jpg").await.unwrap();
    done.store(true, Ordering::Release);
    watcher.await.unwrap();

    assert_eq!(outcome.asset.final_path, final_path);
    assert_eq!(std::fs::read(&final_path).unwrap(), expected);
    let hidden: Vec<_> = std::fs::read_dir(root.path().join("2024/03"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with('.'))
        .collect();
    assert!(hidden.is_empty(), "staging files left behind: {hidden:?}");
}

/// Fails only the thumbnail.
struct NoThumbnails(NativeResizer);

#[async_trait]
impl Resizer for NoThumbnails {
    fn name(&self) -> &'static str {
        "no-thumbnails"
    }

    async fn resize(&self, request: &ResizeRequest) -> iv_core::Result<()> {
        if request.bounds == iv_resize::THUMBNAIL_BOUNDS {
            return Err(iv_core::Error::tool("convert", "killed"));
        }
        self.0.resize(request).await
    }
}

#[tokio::test]
async fn thumbnail_failure_keeps_display_variant() {
    let root = tempfile::tempdir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let upload = jpeg_upload(tmp.path(), "wide.jpg", 4096, 1024);

    let store =
        LocalImageStore::new(settings(root.path()), Arc::new(NoThumbnails(NativeResizer::new())))
            .unwrap();
    let outcome = store.save_file(&upload, "wide.jpg").await.unwrap();

    assert!(outcome.is_partial());
    assert_eq!(outcome.warnings.len(), 1);
    assert!(!outcome.asset.thumbnail_path.exists());
    let display = image::open(&outcome.asset.final_path).unwrap();
    assert_eq!((display.width(), display.height()), (2048, 512));
}

#[tokio::test]
async fn exists_never_fails() {
    let root = tempfile::tempdir().unwrap();
    let store = native_store(root.path());

    assert!(store.exists(root.path()).await);
    assert!(!store.exists(root.path().join("nope/nothing.jpg")).await);
    assert!(!store.exists("").await);
}
