//! Document stores.
//!
//! A [`DocumentStore`] moves raw mosaic bytes to and from a storage medium.
//! Parsing, decompression and caching live above it, in
//! [`MosaicRegistry`](registry::MosaicRegistry).
//!
//! # Locations
//!
//! | Location                  | Store          | Writable |
//! |---------------------------|----------------|----------|
//! | `/path/to/mosaic.json`    | [`FileStore`]  | yes      |
//! | `file:///path/...`        | [`FileStore`]  | yes      |
//! | `http(s)://host/...`      | [`HttpStore`]  | no       |
//! | `s3://bucket/key`         | [`S3Store`]    | yes      |
//! | `memory://name`           | [`MemoryStore`]| yes      |
//!
//! [`StoreRouter`] picks the store from the location's scheme.

mod file;
mod http;
mod memory;
pub mod registry;
mod s3;

pub use file::FileStore;
pub use http::HttpStore;
pub use memory::MemoryStore;
pub use registry::{MosaicRegistry, DEFAULT_MOSAIC_CACHE_CAPACITY};
pub use s3::{create_s3_client, S3Store};

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::error::StoreError;

// =============================================================================
// DocumentStore Trait
// =============================================================================

/// Byte-level access to mosaic documents on a storage medium.
///
/// Stores are read-only unless they override [`DocumentStore::is_writable`]
/// and [`DocumentStore::write`]; the default `write` fails with
/// [`StoreError::Unsupported`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short store name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Name of the store actually serving `location`.
    fn name_for(&self, _location: &str) -> &'static str {
        self.name()
    }

    /// Whether [`DocumentStore::write`] is supported for `location`.
    fn is_writable(&self, _location: &str) -> bool {
        false
    }

    /// Read the raw (possibly compressed) document bytes.
    async fn read(&self, location: &str) -> Result<Bytes, StoreError>;

    /// Replace the document at `location` with `body`.
    async fn write(&self, _location: &str, _body: Bytes) -> Result<(), StoreError> {
        Err(StoreError::Unsupported {
            store: self.name(),
            operation: "write",
        })
    }
}

// =============================================================================
// Location
// =============================================================================

/// A parsed mosaic location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    Http(String),
    S3 { bucket: String, key: String },
    Memory(String),
}

impl Location {
    /// Parse a location string. Strings without a scheme are local paths.
    pub fn parse(location: &str) -> Result<Self, StoreError> {
        let invalid = |reason: &str| StoreError::InvalidLocation {
            location: location.to_string(),
            reason: reason.to_string(),
        };

        if !location.contains("://") {
            if location.is_empty() {
                return Err(invalid("empty location"));
            }
            return Ok(Location::File(PathBuf::from(location)));
        }

        let url = Url::parse(location).map_err(|e| invalid(&e.to_string()))?;
        match url.scheme() {
            "file" => url
                .to_file_path()
                .map(Location::File)
                .map_err(|_| invalid("not a valid file URL")),
            "http" | "https" => Ok(Location::Http(location.to_string())),
            "s3" => {
                let bucket = url
                    .host_str()
                    .filter(|b| !b.is_empty())
                    .ok_or_else(|| invalid("missing bucket"))?;
                let key = url.path().trim_start_matches('/');
                if key.is_empty() {
                    return Err(invalid("missing object key"));
                }
                Ok(Location::S3 {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            "memory" => Ok(Location::Memory(location.to_string())),
            other => Err(invalid(&format!("unsupported scheme '{other}'"))),
        }
    }
}

// =============================================================================
// StoreRouter
// =============================================================================

/// Dispatches each location to the store matching its scheme.
pub struct StoreRouter {
    file: FileStore,
    http: HttpStore,
    s3: Option<S3Store>,
    memory: MemoryStore,
}

impl StoreRouter {
    /// Router without S3 support.
    pub fn new() -> Self {
        Self {
            file: FileStore::new(),
            http: HttpStore::new(),
            s3: None,
            memory: MemoryStore::new(),
        }
    }

    /// Enable `s3://` locations.
    pub fn with_s3(mut self, s3: S3Store) -> Self {
        self.s3 = Some(s3);
        self
    }

    /// The process-local store behind `memory://` locations.
    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    fn route(&self, location: &str) -> Result<&dyn DocumentStore, StoreError> {
        let store: &dyn DocumentStore = match Location::parse(location)? {
            Location::File(_) => &self.file,
            Location::Http(_) => &self.http,
            Location::Memory(_) => &self.memory,
            Location::S3 { .. } => match &self.s3 {
                Some(s3) => s3,
                None => {
                    return Err(StoreError::InvalidLocation {
                        location: location.to_string(),
                        reason: "S3 is not configured".to_string(),
                    })
                }
            },
        };
        Ok(store)
    }
}

impl Default for StoreRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for StoreRouter {
    fn name(&self) -> &'static str {
        "router"
    }

    fn name_for(&self, location: &str) -> &'static str {
        self.route(location)
            .map(|store| store.name())
            .unwrap_or(self.name())
    }

    fn is_writable(&self, location: &str) -> bool {
        self.route(location)
            .map(|store| store.is_writable(location))
            .unwrap_or(false)
    }

    async fn read(&self, location: &str) -> Result<Bytes, StoreError> {
        self.route(location)?.read(location).await
    }

    async fn write(&self, location: &str, body: Bytes) -> Result<(), StoreError> {
        self.route(location)?.write(location, body).await
    }
}
