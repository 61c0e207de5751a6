//! Shared test harness for integration tests.
//!
//! [`TestHarness`] lays out a throwaway app root with `content/images`
//! inside it and builds a full [`AppContext`] on top. Requests go through
//! the router with `tower::ServiceExt::oneshot`; no socket is bound.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::PathBuf;

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, RgbImage};
use tempfile::TempDir;

use imagevault::config::Config;
use imagevault::server::{create_router, AppContext};

pub const BOUNDARY: &str = "imagevault-test-boundary";

pub struct TestHarness {
    pub ctx: AppContext,
    pub app_root: TempDir,
    pub uploads: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Build a harness after letting `customize` adjust the defaults.
    pub fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        let app_root = tempfile::tempdir().expect("failed to create app root");
        let uploads = tempfile::tempdir().expect("failed to create upload dir");

        let mut config = Config::default();
        config.images.root = app_root.path().join("content").join("images");
        config.images.app_root = Some(app_root.path().to_path_buf());
        config.images.subdir = String::new();
        config.images.upload_dir = Some(uploads.path().to_path_buf());
        customize(&mut config);

        let ctx = AppContext::from_config(config).expect("failed to build context");
        Self {
            ctx,
            app_root,
            uploads,
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.ctx.clone())
    }

    /// `YYYY/MM` (or `YYYY/MM/DD`) of the partition a save would use now.
    pub fn partition(&self) -> String {
        let target = self.ctx.store.target_dir();
        let relative = target
            .strip_prefix(self.ctx.store.images_root())
            .expect("target dir under images root");
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn images_root(&self) -> PathBuf {
        self.ctx.store.images_root().to_path_buf()
    }

    pub fn spooled_files(&self) -> usize {
        std::fs::read_dir(self.uploads.path()).unwrap().count()
    }
}

/// Encode a `width`×`height` JPEG in memory.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .unwrap();
    buf
}

/// `POST /api/images` with a single file part.
pub fn upload_request(field: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: image/jpeg\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/api/images")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
