//! HTTP request handlers for the mosaic lookup API.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check endpoint
//! - `GET /info?url=...` - Mosaic metadata and content id
//! - `GET /mosaicjson?url=...` - Full mosaic document
//! - `GET /tiles/{z}/{x}/{y}?url=...` - Assets for a tile
//! - `GET /point/{lng},{lat}?url=...` - Assets for a point
//!
//! Every mosaic endpoint takes the document location in `url` and an
//! optional `gzip` override.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{MosaicError, StoreError};
use crate::mosaic::{MosaicJson, MosaicMetadata};
use crate::service::{MosaicService, MosaicSource};
use crate::store::DocumentStore;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the mosaic service.
pub struct AppState<S: DocumentStore> {
    pub service: MosaicService<S>,

    /// Cache-Control max-age for lookup responses, in seconds
    pub cache_max_age: u32,
}

impl<S: DocumentStore> AppState<S> {
    pub fn new(service: MosaicService<S>) -> Self {
        Self::with_cache_max_age(service, 3600)
    }

    pub fn with_cache_max_age(service: MosaicService<S>, cache_max_age: u32) -> Self {
        Self {
            service,
            cache_max_age,
        }
    }

    fn cache_control(&self) -> String {
        format!("public, max-age={}", self.cache_max_age)
    }
}

impl<S: DocumentStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            cache_max_age: self.cache_max_age,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters shared by all mosaic endpoints.
#[derive(Debug, Deserialize)]
pub struct MosaicQueryParams {
    /// Mosaic location (path, http(s)://, s3:// or memory://)
    pub url: String,

    /// Force gzip decompression on or off
    #[serde(default)]
    pub gzip: Option<bool>,
}

impl MosaicQueryParams {
    fn source(&self) -> MosaicSource {
        MosaicSource::new(&self.url).with_gzip(self.gzip)
    }
}

/// Path parameters for tile requests: `/tiles/{z}/{x}/{y}`.
#[derive(Debug, Deserialize)]
pub struct TilePathParams {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

/// Path parameters for point requests: `/point/{coordinates}`.
#[derive(Debug, Deserialize)]
pub struct PointPathParams {
    /// `lng,lat`
    pub coordinates: String,
}

impl PointPathParams {
    /// Parse `lng,lat`.
    pub fn lng_lat(&self) -> Option<(f64, f64)> {
        let (lng, lat) = self.coordinates.split_once(',')?;
        Some((lng.trim().parse().ok()?, lat.trim().parse().ok()?))
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_request")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Mosaic metadata plus its content id.
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub mosaicid: String,

    #[serde(flatten)]
    pub metadata: MosaicMetadata,
}

#[derive(Debug, Serialize)]
pub struct TileAssetsResponse {
    pub z: u8,
    pub x: u32,
    pub y: u32,
    pub assets: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PointAssetsResponse {
    /// `[lng, lat]`
    pub coordinates: [f64; 2],
    pub assets: Vec<String>,
}

// =============================================================================
// Error Mapping
// =============================================================================

fn classify(err: &MosaicError) -> (StatusCode, &'static str) {
    match err {
        MosaicError::Grid(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        MosaicError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_mosaic"),
        MosaicError::Decode { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "decode_error"),
        MosaicError::MixedDatasetType { .. } | MosaicError::NoFootprints(_) => {
            (StatusCode::BAD_REQUEST, "invalid_footprints")
        }
        MosaicError::Encode(_) => (StatusCode::INTERNAL_SERVER_ERROR, "encode_error"),
        MosaicError::Store(store_err) => match store_err {
            StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            StoreError::Auth { .. } => (StatusCode::FORBIDDEN, "forbidden"),
            StoreError::InvalidLocation { .. } => (StatusCode::BAD_REQUEST, "invalid_location"),
            StoreError::Unsupported { .. } => (StatusCode::NOT_IMPLEMENTED, "unsupported"),
            StoreError::Connection { .. } => (StatusCode::BAD_GATEWAY, "connection_error"),
            StoreError::Status { .. } => (StatusCode::BAD_GATEWAY, "storage_error"),
            StoreError::Io { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
        },
    }
}

/// Convert MosaicError to HTTP response.
///
/// - 5xx errors are logged at ERROR level
/// - 404s at DEBUG level, other 4xx at WARN level
impl IntoResponse for MosaicError {
    fn into_response(self) -> Response {
        let (status, error_type) = classify(&self);
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle health check requests.
///
/// `200 OK` with `{"status": "healthy", "version": "..."}`.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle mosaic info requests.
///
/// # Endpoint
///
/// `GET /info?url={location}`
///
/// # Response
///
/// `200 OK` with every document field except `tiles`, plus `mosaicid`.
pub async fn info_handler<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<MosaicQueryParams>,
) -> Result<Json<InfoResponse>, MosaicError> {
    let doc = state.service.fetch(&query.source()).await?;
    Ok(Json(InfoResponse {
        mosaicid: doc.mosaic_id()?,
        metadata: doc.metadata(),
    }))
}

/// Handle full document requests: `GET /mosaicjson?url={location}`.
pub async fn mosaicjson_handler<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<MosaicQueryParams>,
) -> Result<Json<MosaicJson>, MosaicError> {
    let doc = state.service.fetch(&query.source()).await?;
    Ok(Json(doc.as_ref().clone()))
}

/// Handle tile lookups.
///
/// # Endpoint
///
/// `GET /tiles/{z}/{x}/{y}?url={location}`
///
/// # Response
///
/// - `200 OK`: `{"z": .., "x": .., "y": .., "assets": [...]}`; a tile with
///   no assets returns an empty list
/// - `400 Bad Request`: tile outside the grid
/// - `404 Not Found`: mosaic not found
pub async fn tile_handler<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path(params): Path<TilePathParams>,
    Query(query): Query<MosaicQueryParams>,
) -> Result<Response, MosaicError> {
    let assets = state
        .service
        .tile(&query.source(), params.x, params.y, params.z)
        .await?;

    let body = TileAssetsResponse {
        z: params.z,
        x: params.x,
        y: params.y,
        assets,
    };
    Ok((
        [(header::CACHE_CONTROL, state.cache_control())],
        Json(body),
    )
        .into_response())
}

/// Handle point lookups.
///
/// # Endpoint
///
/// `GET /point/{lng},{lat}?url={location}`
pub async fn point_handler<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path(params): Path<PointPathParams>,
    Query(query): Query<MosaicQueryParams>,
) -> Result<Response, Response> {
    let Some((lng, lat)) = params.lng_lat() else {
        let status = StatusCode::BAD_REQUEST;
        let error_response = ErrorResponse::with_status(
            "invalid_request",
            format!("Invalid coordinates '{}', expected lng,lat", params.coordinates),
            status,
        );
        return Err((status, Json(error_response)).into_response());
    };

    let assets = state
        .service
        .point(&query.source(), lng, lat)
        .await
        .map_err(IntoResponse::into_response)?;

    let body = PointAssetsResponse {
        coordinates: [lng, lat],
        assets,
    };
    Ok((
        [(header::CACHE_CONTROL, state.cache_control())],
        Json(body),
    )
        .into_response())
}

// =============================================================================
// Tests
// =============================================================================
