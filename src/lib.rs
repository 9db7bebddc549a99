//! # Mosaic Streamer
//!
//! Build, store and query MosaicJSON documents: spatial indexes that map
//! Web Mercator tiles to the ordered list of raster assets covering them.
//!
//! ## Features
//!
//! - **Index building**: burns footprints into quadkey tiles in parallel, with
//!   coverage filtering, coverage sorting and per-tile truncation
//! - **Lookup**: assets for any tile at any zoom and for any lng/lat point
//! - **Storage**: local files, HTTP(S), S3 and in-memory stores, gzip aware
//! - **Caching**: LRU of parsed documents with single-flight loading
//! - **HTTP server**: Axum-based lookup API
//!
//! ## Architecture
//!
//! - [`grid`] - Web Mercator tiles, quadkeys and tile burning
//! - [`geometry`] - Polygon coverage and the footprint spatial index
//! - [`footprint`] - Dataset footprints, GeoJSON input and parallel extraction
//! - [`mosaic`] - The document model, builder and lookup engine
//! - [`store`] - Document stores and the cached registry
//! - [`service`] - High-level read/write operations on mosaic locations
//! - [`server`] - HTTP routes and handlers
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use mosaic_streamer::{BuildOptions, MosaicService, MosaicSource, StoreRouter};
//! use mosaic_streamer::footprint::footprints_from_geojson;
//!
//! # async fn run(geojson: &[u8]) -> Result<(), mosaic_streamer::MosaicError> {
//! let service = MosaicService::new(StoreRouter::new());
//! let footprints = footprints_from_geojson(geojson)?;
//!
//! let source = MosaicSource::new("mosaic.json.gz");
//! service
//!     .create(&source, &footprints, 7, 12, &BuildOptions::default())
//!     .await?;
//!
//! let assets = service.point(&source, -73.9, 40.7).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod footprint;
pub mod geometry;
pub mod grid;
pub mod mosaic;
pub mod server;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use config::{Cli, Command};
pub use error::{ExtractionError, GridError, MosaicError, StoreError, ValidationError};
pub use footprint::{Footprint, FootprintExtractor};
pub use grid::Tile;
pub use mosaic::{
    build, items_for_point, items_for_tile, update_tiles, BuildOptions, MosaicJson,
    MosaicMetadata,
};
pub use server::{create_router, AppState, CorsPolicy, RouterConfig};
pub use service::{MosaicService, MosaicSource};
pub use store::{
    create_s3_client, DocumentStore, FileStore, HttpStore, Location, MemoryStore,
    MosaicRegistry, S3Store, StoreRouter,
};
