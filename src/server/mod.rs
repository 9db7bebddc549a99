//! HTTP server layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │        GET /tiles/{z}/{x}/{y}?url=...   GET /point/...          │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌────────────────────────────┐   │
//! │  │        handlers          │  │          routes            │   │
//! │  │ (requests, error → JSON) │  │ (router config, CORS)      │   │
//! │  └──────────────────────────┘  └────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    health_handler, info_handler, mosaicjson_handler, point_handler, tile_handler, AppState,
    ErrorResponse, HealthResponse, InfoResponse, MosaicQueryParams, PointAssetsResponse,
    PointPathParams, TileAssetsResponse, TilePathParams,
};
pub use routes::{create_router, CorsPolicy, RouterConfig};
