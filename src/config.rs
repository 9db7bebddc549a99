//! Configuration management for Mosaic Streamer.
//!
//! Command-line arguments via clap, with environment variable fallbacks
//! under the `MOSAIC_` prefix and defaults for every optional setting.
//!
//! # Subcommands
//!
//! - `create` - Build a mosaic from GeoJSON footprints and write it
//! - `update` - Merge GeoJSON footprints into an existing mosaic
//! - `info` - Print mosaic metadata and content id
//! - `tile` - Print the assets of a tile
//! - `point` - Print the assets covering a point
//! - `serve` - Run the HTTP lookup server
//!
//! # Environment Variables
//!
//! - `MOSAIC_HOST` - Server bind address (default: 0.0.0.0)
//! - `MOSAIC_PORT` - Server port (default: 3000)
//! - `MOSAIC_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `MOSAIC_S3_REGION` - AWS region (default: us-east-1)
//! - `MOSAIC_CACHE_MOSAICS` - Max parsed mosaics to cache (default: 512)
//! - `MOSAIC_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)
//! - `MOSAIC_CORS_ORIGINS` - Allowed CORS origins, comma separated

use clap::{Args, Parser, Subcommand};

use crate::grid::MAX_ZOOM;
use crate::mosaic::BuildOptions;
use crate::store::DEFAULT_MOSAIC_CACHE_CAPACITY;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Mosaic Streamer - build and query MosaicJSON documents.
#[derive(Parser, Debug, Clone)]
#[command(name = "mosaic-streamer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build a mosaic from a GeoJSON FeatureCollection of footprints
    Create(CreateConfig),

    /// Merge new footprints into an existing mosaic
    Update(UpdateConfig),

    /// Print mosaic metadata as JSON
    Info(InfoConfig),

    /// Print the assets of tile x/y/z
    Tile(TileConfig),

    /// Print the assets covering lng/lat
    Point(PointConfig),

    /// Start the HTTP lookup server
    Serve(ServeConfig),
}

// =============================================================================
// Shared Arguments
// =============================================================================

/// Storage, cache and logging options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct StorageArgs {
    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "MOSAIC_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "MOSAIC_S3_REGION")]
    pub s3_region: String,

    /// Maximum number of parsed mosaics to keep in cache.
    #[arg(long, default_value_t = DEFAULT_MOSAIC_CACHE_CAPACITY, env = "MOSAIC_CACHE_MOSAICS")]
    pub cache_mosaics: usize,

    /// Treat mosaic documents as gzip compressed, whatever their suffix.
    #[arg(long, conflicts_with = "no_gzip")]
    pub gzip: bool,

    /// Treat mosaic documents as plain JSON, whatever their suffix.
    #[arg(long)]
    pub no_gzip: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl StorageArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_mosaics == 0 {
            return Err("cache_mosaics must be greater than 0".to_string());
        }
        if self.s3_region.is_empty() {
            return Err("s3_region must not be empty".to_string());
        }
        Ok(())
    }

    /// Explicit gzip flag, `None` to follow the `.gz` suffix.
    pub fn gzip_override(&self) -> Option<bool> {
        match (self.gzip, self.no_gzip) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Index building options.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Mosaic minimum zoom (default: largest native minzoom of the footprints).
    #[arg(long)]
    pub minzoom: Option<u8>,

    /// Mosaic maximum zoom (default: largest native maxzoom of the footprints).
    #[arg(long)]
    pub maxzoom: Option<u8>,

    /// Zoom at which the tiles index is keyed (default: minzoom).
    #[arg(long)]
    pub quadkey_zoom: Option<u8>,

    /// Drop assets covering this fraction of a tile or less (0-1).
    #[arg(long)]
    pub min_tile_cover: Option<f64>,

    /// Order assets by tile coverage, largest first.
    #[arg(long, default_value_t = false)]
    pub tile_cover_sort: bool,

    /// Keep at most this many assets per tile.
    #[arg(long)]
    pub max_items_per_tile: Option<usize>,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub attribution: Option<String>,
}

impl BuildArgs {
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("minzoom", self.minzoom),
            ("maxzoom", self.maxzoom),
            ("quadkey_zoom", self.quadkey_zoom),
        ] {
            if let Some(z) = value {
                if z > MAX_ZOOM {
                    return Err(format!("{field} must be between 0 and {MAX_ZOOM}"));
                }
            }
        }

        if let (Some(min), Some(max)) = (self.minzoom, self.maxzoom) {
            if min > max {
                return Err("minzoom must be less than or equal to maxzoom".to_string());
            }
        }

        if let Some(cover) = self.min_tile_cover {
            if !(0.0..=1.0).contains(&cover) {
                return Err("min_tile_cover must be between 0 and 1".to_string());
            }
        }

        if self.max_items_per_tile == Some(0) {
            return Err("max_items_per_tile must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Builder options from the command line.
    pub fn options(&self) -> BuildOptions {
        BuildOptions {
            quadkey_zoom: self.quadkey_zoom,
            minimum_tile_cover: self.min_tile_cover,
            tile_cover_sort: self.tile_cover_sort,
            maximum_items_per_tile: self.max_items_per_tile,
            name: self.name.clone(),
            description: self.description.clone(),
            attribution: self.attribution.clone(),
        }
    }
}

// =============================================================================
// Subcommand Configurations
// =============================================================================

/// `create` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CreateConfig {
    /// GeoJSON footprints (path, http(s)://, s3:// location).
    pub footprints: String,

    /// Where to write the mosaic; a `.gz` suffix writes it compressed.
    #[arg(short, long)]
    pub output: String,

    #[command(flatten)]
    pub build: BuildArgs,

    #[command(flatten)]
    pub storage: StorageArgs,
}

impl CreateConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.output.is_empty() {
            return Err("output location is required".to_string());
        }
        self.build.validate()?;
        self.storage.validate()
    }
}

/// `update` subcommand.
#[derive(Args, Debug, Clone)]
pub struct UpdateConfig {
    /// GeoJSON footprints to add.
    pub footprints: String,

    /// Mosaic to update (must be on a writable store).
    #[arg(short, long)]
    pub mosaic: String,

    /// Append new assets after the existing ones instead of before.
    #[arg(long, default_value_t = false)]
    pub add_last: bool,

    #[command(flatten)]
    pub build: BuildArgs,

    #[command(flatten)]
    pub storage: StorageArgs,
}

impl UpdateConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.build.validate()?;
        self.storage.validate()
    }
}

/// `info` subcommand.
#[derive(Args, Debug, Clone)]
pub struct InfoConfig {
    /// Mosaic location.
    pub mosaic: String,

    #[command(flatten)]
    pub storage: StorageArgs,
}

/// `tile` subcommand.
#[derive(Args, Debug, Clone)]
pub struct TileConfig {
    /// Mosaic location.
    pub mosaic: String,

    pub x: u32,
    pub y: u32,
    pub z: u8,

    #[command(flatten)]
    pub storage: StorageArgs,
}

/// `point` subcommand.
#[derive(Args, Debug, Clone)]
pub struct PointConfig {
    /// Mosaic location.
    pub mosaic: String,

    /// Longitude in degrees.
    #[arg(allow_hyphen_values = true)]
    pub lng: f64,

    /// Latitude in degrees.
    #[arg(allow_hyphen_values = true)]
    pub lat: f64,

    #[command(flatten)]
    pub storage: StorageArgs,
}

impl PointConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(-180.0..=180.0).contains(&self.lng) || !(-90.0..=90.0).contains(&self.lat) {
            return Err(format!(
                "coordinates ({}, {}) are outside lng [-180, 180] / lat [-90, 90]",
                self.lng, self.lat
            ));
        }
        self.storage.validate()
    }
}

/// `serve` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "MOSAIC_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "MOSAIC_PORT")]
    pub port: u16,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "MOSAIC_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    /// Allowed CORS origins (comma-separated). Any origin when unset.
    #[arg(long, env = "MOSAIC_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,

    #[command(flatten)]
    pub storage: StorageArgs,
}

impl ServeConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("host must not be empty".to_string());
        }
        self.storage.validate()
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Tests
// =============================================================================
