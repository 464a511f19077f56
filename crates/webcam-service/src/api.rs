//! HTTP endpoints of the gallery.
//!
//! # Routes
//!
//! - `GET /` - HTML gallery, newest first, grouped by day
//! - `GET /images/{filename}` - Original image, never cached
//! - `GET /thumbnails/{filename}` - Thumbnail, cached for a year, generated on demand
//! - `GET /api/health` - Service health check
//! - `GET /api/images` - JSON listing of the archive
//!
//! ## Error Handling
//!
//! All failures return structured JSON errors via [`AppError`]. A file that
//! was listed but is gone by the time it is served is a 404, like any other
//! missing file. Store errors return HTTP 500.
//!
//! # Example
//!
//! ```ignore
//! use webcam_service::api;
//!
//! let app = api::router().with_state(state);
//! ```

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, warn};

use webcam_core::{ImageKey, Thumbnail};

use crate::gallery::{self, GalleryItem};
use crate::state::AppState;

/// `Cache-Control` for originals: the newest image must never be stale.
pub const ORIGINAL_CACHE_CONTROL: &str = "no-store, no-cache, must-revalidate, max-age=0";
/// `Cache-Control` for thumbnails: immutable once written.
pub const THUMBNAIL_CACHE_CONTROL: &str = "public, max-age=31536000";

const JPEG: &str = "image/jpeg";

/// Create the router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(gallery_page))
        .route("/images/{filename}", get(serve_image))
        .route("/thumbnails/{filename}", get(serve_thumbnail))
        .route("/api/health", get(health))
        .route("/api/images", get(list_images))
        .fallback(unknown_route)
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

/// Archive listing response.
#[derive(Debug, Serialize)]
pub struct ImagesResponse {
    pub count: usize,
    pub is_daytime: bool,
    pub images: Vec<GalleryItem>,
}

/// List all stored images, newest first.
async fn list_images(State(state): State<Arc<AppState>>) -> Result<Json<ImagesResponse>, AppError> {
    let store = Arc::clone(&state.store);
    let images = tokio::task::spawn_blocking(move || store.list()).await??;
    let images: Vec<GalleryItem> = images.iter().map(GalleryItem::from).collect();

    Ok(Json(ImagesResponse {
        count: images.len(),
        is_daytime: state.is_daytime(),
        images,
    }))
}

/// The HTML gallery.
///
/// Every listed image gets its thumbnail ensured; images whose thumbnail
/// cannot be produced are left out. If the archive cannot be listed the page
/// still renders, with no images.
async fn gallery_page(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let store = Arc::clone(&state.store);
    let items = tokio::task::spawn_blocking(move || -> Vec<GalleryItem> {
        let images = match store.list() {
            Ok(images) => images,
            Err(e) => {
                error!("Failed to list images: {}", e);
                return Vec::new();
            }
        };
        images
            .iter()
            .filter(|image| store.thumbnail(image).is_some())
            .map(GalleryItem::from)
            .collect()
    })
    .await?;

    Ok(Html(gallery::render(&items, state.is_daytime())))
}

/// Serve an original.
async fn serve_image(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let path = state
        .store
        .image_path(&filename)
        .map_err(|_| AppError::NotFound(format!("Image not found: {}", filename)))?;

    let bytes = read_file(path)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Image not found: {}", filename)))?;

    Ok((
        [
            (header::CONTENT_TYPE, JPEG),
            (header::CACHE_CONTROL, ORIGINAL_CACHE_CONTROL),
        ],
        bytes,
    )
        .into_response())
}

/// Serve a thumbnail, generating it first if its original exists.
async fn serve_thumbnail(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let not_found = || AppError::NotFound(format!("Thumbnail not found: {}", filename));

    let path = state.store.thumbnail_path(&filename).map_err(|_| not_found())?;

    let bytes = match read_file(path).await? {
        Some(bytes) => bytes,
        None => {
            let key = ImageKey::from_thumbnail_name(&filename).map_err(|_| not_found())?;
            let store = Arc::clone(&state.store);
            let generated = tokio::task::spawn_blocking(
                move || -> webcam_store::Result<Option<Thumbnail>> {
                    let Some(image) = store.get(&key)? else {
                        return Ok(None);
                    };
                    store.ensure_thumbnail(&image).map(Some)
                },
            )
            .await?;

            let thumbnail = match generated {
                Ok(Some(thumbnail)) => thumbnail,
                Ok(None) => return Err(not_found()),
                Err(e) if e.is_not_found() => return Err(not_found()),
                Err(e) => return Err(e.into()),
            };
            debug!("Generated {} on request", thumbnail.file_name());

            read_file(thumbnail.path).await?.ok_or_else(not_found)?
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, JPEG),
            (header::CACHE_CONTROL, THUMBNAIL_CACHE_CONTROL),
        ],
        bytes,
    )
        .into_response())
}

async fn unknown_route() -> AppError {
    AppError::NotFound("Not found".to_string())
}

/// Read a whole file, mapping "does not exist" to `None`.
async fn read_file(path: PathBuf) -> Result<Option<Vec<u8>>, AppError> {
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            Err(AppError::Internal(format!("Failed to read file: {}", e)))
        }
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Store(webcam_store::Error),
    Internal(String),
}

impl From<webcam_store::Error> for AppError {
    fn from(e: webcam_store::Error) -> Self {
        AppError::Store(e)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Background task failed: {}", e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}
