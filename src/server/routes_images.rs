//! Image upload, existence checks and static serving.

use std::path::Path;

use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Multipart, Query, State},
    http::{header, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer};

use iv_store::{SaveOutcome, SaveStatus, SaveWarning, UploadedImage};

use super::error::AppError;
use super::AppContext;

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "uploadimage";

/// Stored files never change under a given URL, so clients may keep them for a year.
pub const CACHE_CONTROL_ONE_YEAR: &str = "public, max-age=31536000";

pub fn image_routes(max_upload_bytes: usize) -> Router<AppContext> {
    Router::new()
        .route(
            "/images",
            post(upload_image).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/images/exists", get(image_exists))
}

/// Static file service for `images_root`, mounted at `base_url`.
///
/// Every response, including 404s, carries the one-year cache header.
pub fn serve(base_url: &str, images_root: &Path) -> Router {
    let service = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_ONE_YEAR),
        ))
        .service(ServeDir::new(images_root));

    Router::new().nest_service(base_url.trim_end_matches('/'), service)
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub status: SaveStatus,
    pub warnings: Vec<SaveWarning>,
}

impl From<SaveOutcome> for UploadResponse {
    fn from(outcome: SaveOutcome) -> Self {
        Self {
            url: outcome.url,
            status: outcome.status,
            warnings: outcome.warnings,
        }
    }
}

async fn upload_image(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original_filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| {
                iv_core::Error::Validation(format!("field '{}' has no filename", UPLOAD_FIELD))
            })?;
        let mime_type = field.content_type().map(str::to_owned);

        let spooled = spool(&mut field, &ctx.upload_dir).await?;
        let mut upload = UploadedImage::new(spooled.to_path_buf(), original_filename);
        if let Some(mime_type) = mime_type {
            upload = upload.with_mime_type(mime_type);
        }

        // The store deletes the spooled file once placed; dropping the guard
        // afterwards only matters when the save failed early.
        let outcome = ctx.store.save(upload).await;
        drop(spooled);

        return Ok((StatusCode::CREATED, Json(outcome?.into())));
    }

    Err(iv_core::Error::Validation(format!("missing multipart field '{}'", UPLOAD_FIELD)).into())
}

/// Stream a multipart field into a fresh file inside `dir`.
async fn spool(field: &mut Field<'_>, dir: &Path) -> Result<TempPath, AppError> {
    tokio::fs::create_dir_all(dir).await?;

    let (file, path) = tempfile::Builder::new()
        .prefix("upload-")
        .tempfile_in(dir)?
        .into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut written = 0u64;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    tracing::debug!(path = %path.display(), bytes = written, "upload spooled");
    Ok(path)
}

#[derive(Debug, Deserialize)]
pub struct ExistsQuery {
    /// Path relative to the images root, e.g. `2024/03/photo.jpg`.
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct ExistsResponse {
    pub exists: bool,
}

async fn image_exists(
    State(ctx): State<AppContext>,
    Query(query): Query<ExistsQuery>,
) -> Result<Json<ExistsResponse>, AppError> {
    let path = ctx.store.stored_path(&query.path)?;
    let exists = ctx.store.exists(&path).await;
    Ok(Json(ExistsResponse { exists }))
}
