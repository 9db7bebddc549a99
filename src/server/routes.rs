//! Route table and middleware stack for the lookup server.
//!
//! ```text
//! GET /health                      liveness
//! GET /info?url=                   metadata + mosaicid
//! GET /mosaicjson?url=             whole document
//! GET /tiles/{z}/{x}/{y}?url=      tile -> assets
//! GET /point/{lng},{lat}?url=      point -> assets
//!
//!   request ─► TraceLayer ─► CorsLayer ─► handler ─► MosaicService
//! ```
//!
//! Every mosaic route also takes `gzip=true|false`.

use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::handlers::{
    health_handler, info_handler, mosaicjson_handler, point_handler, tile_handler, AppState,
};
use crate::service::MosaicService;
use crate::store::DocumentStore;

/// Browsers may reuse a preflight answer for a day.
const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

// =============================================================================
// Router Configuration
// =============================================================================

/// Which browser origins may read lookup responses.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CorsPolicy {
    #[default]
    AnyOrigin,

    /// Exact origins such as `https://maps.example.com`; empty means none
    Origins(Vec<String>),
}

/// Knobs for [`create_router`].
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub cors: CorsPolicy,

    /// `max-age` sent with every lookup response
    pub cache_max_age: u32,

    pub enable_tracing: bool,
}

impl RouterConfig {
    pub fn new() -> Self {
        Self {
            cors: CorsPolicy::AnyOrigin,
            cache_max_age: 3600,
            enable_tracing: true,
        }
    }

    /// Restrict CORS to `origins`.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors = CorsPolicy::Origins(origins);
        self
    }

    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Mount the lookup routes over `service`.
pub fn create_router<S>(service: MosaicService<S>, config: RouterConfig) -> Router
where
    S: DocumentStore + 'static,
{
    let state = AppState::with_cache_max_age(service, config.cache_max_age);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/info", get(info_handler::<S>))
        .route("/mosaicjson", get(mosaicjson_handler::<S>))
        .route("/tiles/{z}/{x}/{y}", get(tile_handler::<S>))
        .route("/point/{coordinates}", get(point_handler::<S>))
        .with_state(state)
        .layer(cors_layer(&config.cors));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn cors_layer(policy: &CorsPolicy) -> CorsLayer {
    // Lookups are read-only
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(PREFLIGHT_MAX_AGE);

    match policy {
        CorsPolicy::AnyOrigin => layer.allow_origin(Any),
        CorsPolicy::Origins(origins) if origins.is_empty() => layer,
        CorsPolicy::Origins(origins) if origins.iter().any(|o| o == "*") => layer.allow_origin(Any),
        CorsPolicy::Origins(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = %origin, "Ignoring malformed CORS origin");
                        None
                    }
                })
                .collect();
            layer.allow_origin(AllowOrigin::list(allowed))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
