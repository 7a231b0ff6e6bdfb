//! HTTP gateway: upload ingestion plus the three hook routes.
//!
//! | Route | Method | Success | Failure |
//! |---|---|---|---|
//! | `/upload` | POST multipart | `{ok, upload_url, upload_id}` | 400 |
//! | `/render` | POST JSON | `{ok, view_url, view_id}` | 400 / 404 |
//! | `/segment` | POST JSON | `{ok, sky_url, sky_id}` | 400 / 404 |
//! | `/forecast` | POST JSON | `{ok, result}` | 400 / 404 / 501 / 500 |
//! | `/uploads/*`, `/gen/*` | GET | static artifact bytes | 404 |
//!
//! Every response body is JSON; failures are `{ok: false, error}`. No
//! request failure is fatal to the service. Hook fallbacks per contract:
//! render degrades to the unmodified preview, segment to a fully
//! transparent mask, forecast surfaces 501 (there is no sensible default
//! forecast to fake).
//!
//! Image decode and encode run under `spawn_blocking` so a large RAW
//! develop does not stall the async executor.

use crate::engine::{AperturePoint, EngineError, OrientationAngles, SkyEngine};
use crate::imaging;
use crate::store::{ArtifactStore, StoreError};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use image::RgbaImage;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Uploads above this size are rejected outright. RAW files from current
/// sensors run 25-80 MB; 256 MB leaves headroom without being unbounded.
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Everything a request handler needs, built once at startup.
pub struct AppState {
    pub store: ArtifactStore,
    pub engine: Box<dyn SkyEngine>,
    pub preview_max_edge: u32,
}

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid listen address: {0}")]
    Listen(String),
}

/// Request-boundary error taxonomy. Every variant renders as
/// `{ok: false, error}` with the matching status code.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    NotImplemented(String),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "ok": false, "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            // A malformed handle and an absent one look the same to callers.
            StoreError::NotFound(_) | StoreError::InvalidId(_) => {
                ApiError::NotFound("Uploaded preview not found".into())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let uploads = ServeDir::new(state.store.upload_dir());
    let generated = ServeDir::new(state.store.gen_dir());
    Router::new()
        .route("/upload", post(upload))
        .route("/render", post(render))
        .route("/segment", post(segment))
        .route("/forecast", post(forecast))
        .nest_service("/uploads", uploads)
        .nest_service("/gen", generated)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Bind and serve until shutdown.
pub async fn serve(
    config: crate::config::ServerConfig,
    engine: Box<dyn SkyEngine>,
) -> Result<(), ServeError> {
    let addr: SocketAddr = config
        .listen
        .parse()
        .map_err(|_| ServeError::Listen(config.listen.clone()))?;
    let store = ArtifactStore::open(config.upload_dir(), config.gen_dir())?;
    let router = app(AppState {
        store,
        engine,
        preview_max_edge: config.preview.max_edge,
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {addr}");
    axum::serve(listener, router).await?;
    Ok(())
}

async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {e}")))?;
            file = Some((filename, bytes));
            break;
        }
    }

    let (filename, bytes) = file.ok_or_else(|| ApiError::BadRequest("No file part".into()))?;
    if filename.is_empty() {
        return Err(ApiError::BadRequest("No selected file".into()));
    }
    let ext = imaging::allowed_extension(&filename)
        .ok_or_else(|| ApiError::BadRequest("Unsupported file type".into()))?;

    let preview = run_blocking(move |state| {
        let upload = state.store.save_upload(&ext, &bytes)?;
        tracing::debug!(id = %upload.id, bytes = bytes.len(), "stored upload");
        let raster = imaging::decode_any(&upload.path, &ext)
            .map_err(|e| ApiError::BadRequest(format!("Failed to read image: {e}")))?;
        let preview = imaging::shrink_to_fit(&raster, state.preview_max_edge);
        Ok(state.store.save_generated("", &preview)?)
    }, state)
    .await?;

    Ok(Json(json!({
        "ok": true,
        "upload_url": preview.url,
        "upload_id": preview.id,
    })))
}

#[derive(Debug, Deserialize)]
struct RenderRequest {
    #[serde(default)]
    upload_id: String,
    #[serde(default)]
    azimuth: f64,
    #[serde(default)]
    zenith: f64,
    #[serde(default)]
    roll: f64,
}

async fn render(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RenderRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.upload_id.is_empty() {
        return Err(ApiError::BadRequest("Missing upload id".into()));
    }
    let angles = OrientationAngles {
        azimuth: req.azimuth,
        zenith: req.zenith,
        roll: req.roll,
    };

    let view = run_blocking(move |state| {
        let path = state.store.resolve_generated(&req.upload_id)?;
        let preview = load_raster(&path)?;
        let out = match state.engine.orientation_render(&preview, angles) {
            Ok(rendered) => rendered,
            Err(EngineError::NotSupported) => preview,
            Err(EngineError::Failed(msg)) => {
                tracing::warn!(error = %msg, "orientation render hook failed; returning input unchanged");
                preview
            }
        };
        Ok(state.store.save_generated("view_", &out)?)
    }, state)
    .await?;

    Ok(Json(json!({
        "ok": true,
        "view_url": view.url,
        "view_id": view.id,
    })))
}

#[derive(Debug, Deserialize)]
struct SegmentRequest {
    #[serde(default)]
    upload_id: String,
    #[serde(default)]
    points: Vec<AperturePoint>,
}

async fn segment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SegmentRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // Point count is validated before any artifact or hook work.
    if req.upload_id.is_empty() || req.points.len() != 3 {
        return Err(ApiError::BadRequest(
            "Need upload_id and exactly 3 points".into(),
        ));
    }
    let points = <[AperturePoint; 3]>::try_from(req.points.as_slice())
        .map_err(|_| ApiError::BadRequest("Need upload_id and exactly 3 points".into()))?;

    let sky = run_blocking(move |state| {
        let path = state.store.resolve_generated(&req.upload_id)?;
        let preview = load_raster(&path)?;
        let mask = match state.engine.sky_segment(&preview, &points) {
            Ok(mask) => mask,
            Err(EngineError::NotSupported) => transparent_like(&preview),
            Err(EngineError::Failed(msg)) => {
                tracing::warn!(error = %msg, "sky segment hook failed; returning empty mask");
                transparent_like(&preview)
            }
        };
        Ok(state.store.save_generated("sky_", &mask)?)
    }, state)
    .await?;

    Ok(Json(json!({
        "ok": true,
        "sky_url": sky.url,
        "sky_id": sky.id,
    })))
}

#[derive(Debug, Deserialize)]
struct ForecastRequest {
    #[serde(default)]
    upload_id: String,
    #[serde(default)]
    azimuth: f64,
    #[serde(default)]
    zenith: f64,
    #[serde(default)]
    roll: f64,
    #[serde(default)]
    points: Vec<AperturePoint>,
}

async fn forecast(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForecastRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.upload_id.is_empty() {
        return Err(ApiError::BadRequest("Missing upload id".into()));
    }
    let angles = OrientationAngles {
        azimuth: req.azimuth,
        zenith: req.zenith,
        roll: req.roll,
    };

    let report = run_blocking(move |state| {
        let path = state.store.resolve_generated(&req.upload_id)?;
        let preview = load_raster(&path)?;
        match state.engine.forecast_energy(&preview, angles, &req.points) {
            Ok(report) => Ok(report),
            Err(EngineError::NotSupported) => Err(ApiError::NotImplemented(
                "No forecast implementation is bound".into(),
            )),
            Err(EngineError::Failed(msg)) => {
                Err(ApiError::Internal(format!("Forecast failed: {msg}")))
            }
        }
    }, state)
    .await?;

    Ok(Json(json!({ "ok": true, "result": report })))
}

/// Run closed-over image work on the blocking pool.
async fn run_blocking<T, F>(work: F, state: Arc<AppState>) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || work(&state))
        .await
        .map_err(|e| ApiError::Internal(format!("worker task failed: {e}")))?
}

/// Load a persisted preview back into the canonical raster form.
fn load_raster(path: &Path) -> Result<RgbaImage, ApiError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|e| ApiError::Internal(format!("Failed to read preview: {e}")))
}

/// Fully transparent RGBA image with the dimensions of `img`.
fn transparent_like(img: &RgbaImage) -> RgbaImage {
    RgbaImage::new(img.width(), img.height())
}

// Route-level behavior is covered by the integration tests in tests/api.rs;
// the unit tests here pin the error mapping.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_maps_to_404() {
        let api: ApiError = StoreError::NotFound("x.png".into()).into();
        assert!(matches!(api, ApiError::NotFound(_)));
    }

    #[test]
    fn store_invalid_id_maps_to_404() {
        let api: ApiError = StoreError::InvalidId("../x".into()).into();
        assert!(matches!(api, ApiError::NotFound(_)));
    }

    #[test]
    fn store_io_maps_to_500() {
        let io = std::io::Error::other("disk fell over");
        let api: ApiError = StoreError::Io(io).into();
        assert!(matches!(api, ApiError::Internal(_)));
    }

    #[test]
    fn transparent_like_matches_dimensions_and_is_empty() {
        let img = RgbaImage::from_pixel(5, 7, image::Rgba([1, 2, 3, 255]));
        let mask = transparent_like(&img);
        assert_eq!(mask.dimensions(), (5, 7));
        assert!(mask.pixels().all(|p| p[3] == 0));
    }
}
