//! Mosaic service: the operations a consumer runs against a mosaic location.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        MosaicService                         │
//! │   fetch / metadata / mosaic_id / tile / point   (read)       │
//! │   create / write / update                       (write)      │
//! │        │                          │                          │
//! │        ▼                          ▼                          │
//! │  ┌────────────────┐      ┌─────────────────┐                 │
//! │  │ MosaicRegistry │─────►│  DocumentStore  │                 │
//! │  │ LRU, 1-flight  │      │ file/http/s3/mem│                 │
//! │  └────────────────┘      └─────────────────┘                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads go through the registry cache. Writes encode the document, hand
//! the bytes to the store and invalidate the cached copy.

use std::sync::Arc;

use tracing::info;

use crate::error::{MosaicError, StoreError};
use crate::footprint::Footprint;
use crate::mosaic::{
    build, items_for_point, items_for_tile, should_decompress, update_tiles, BuildOptions,
    MosaicJson, MosaicMetadata,
};
use crate::store::{DocumentStore, MosaicRegistry};

/// A mosaic location plus an optional gzip override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MosaicSource {
    /// Local path, `http(s)://`, `s3://` or `memory://` location
    pub location: String,

    /// Force gzip on or off; `None` follows the `.gz` suffix
    pub gzip: Option<bool>,
}

impl MosaicSource {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            gzip: None,
        }
    }

    pub fn with_gzip(mut self, gzip: Option<bool>) -> Self {
        self.gzip = gzip;
        self
    }

    /// Whether the stored bytes are gzip compressed.
    pub fn is_gzip(&self) -> bool {
        should_decompress(&self.location, self.gzip)
    }
}

/// Read, query and write mosaics through a cached document store.
///
/// # Type Parameters
///
/// * `S` - The document store (usually [`StoreRouter`](crate::store::StoreRouter))
pub struct MosaicService<S: DocumentStore> {
    registry: Arc<MosaicRegistry<S>>,
}

impl<S: DocumentStore> Clone for MosaicService<S> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<S: DocumentStore> MosaicService<S> {
    /// Create a service with the default cache capacity.
    pub fn new(store: S) -> Self {
        Self::with_registry(MosaicRegistry::new(store))
    }

    pub fn with_registry(registry: MosaicRegistry<S>) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &MosaicRegistry<S> {
        &self.registry
    }

    /// Load a document (cached).
    pub async fn fetch(&self, source: &MosaicSource) -> Result<Arc<MosaicJson>, MosaicError> {
        self.registry.get(&source.location, source.gzip).await
    }

    /// Document fields without `tiles`.
    pub async fn metadata(&self, source: &MosaicSource) -> Result<MosaicMetadata, MosaicError> {
        Ok(self.fetch(source).await?.metadata())
    }

    /// Content id of the document.
    pub async fn mosaic_id(&self, source: &MosaicSource) -> Result<String, MosaicError> {
        self.fetch(source).await?.mosaic_id()
    }

    /// Assets for tile `(x, y, z)`.
    pub async fn tile(
        &self,
        source: &MosaicSource,
        x: u32,
        y: u32,
        z: u8,
    ) -> Result<Vec<String>, MosaicError> {
        let doc = self.fetch(source).await?;
        Ok(items_for_tile(&doc, x, y, z)?)
    }

    /// Assets covering `(lng, lat)`.
    pub async fn point(
        &self,
        source: &MosaicSource,
        lng: f64,
        lat: f64,
    ) -> Result<Vec<String>, MosaicError> {
        let doc = self.fetch(source).await?;
        Ok(items_for_point(&doc, lng, lat)?)
    }

    /// Persist a document, replacing whatever is stored at the location.
    pub async fn write(&self, source: &MosaicSource, doc: &MosaicJson) -> Result<(), MosaicError> {
        doc.validate()?;
        let body = doc.to_bytes(source.is_gzip())?;
        let size = body.len();

        self.registry.store().write(&source.location, body).await?;
        self.registry.invalidate(&source.location).await;

        info!(
            location = %source.location,
            bytes = size,
            tiles = doc.tiles.len(),
            "Wrote mosaic"
        );
        Ok(())
    }

    /// Build a mosaic from footprints and write it.
    pub async fn create(
        &self,
        source: &MosaicSource,
        footprints: &[Footprint],
        minzoom: u8,
        maxzoom: u8,
        options: &BuildOptions,
    ) -> Result<MosaicJson, MosaicError> {
        self.require_writable(source, "write")?;
        let doc = build(footprints, minzoom, maxzoom, options)?;
        self.write(source, &doc).await?;
        Ok(doc)
    }

    /// Merge footprints into the stored mosaic and write the result.
    ///
    /// Only available on writable stores. The stored document is read fresh,
    /// bypassing the cache, so concurrent writers are not masked by a stale
    /// copy.
    pub async fn update(
        &self,
        source: &MosaicSource,
        footprints: &[Footprint],
        add_first: bool,
        options: &BuildOptions,
    ) -> Result<MosaicJson, MosaicError> {
        self.require_writable(source, "update")?;

        self.registry.invalidate(&source.location).await;
        let existing = self.fetch(source).await?;

        let updated = update_tiles(&existing, footprints, add_first, options)?;
        self.write(source, &updated).await?;
        Ok(updated)
    }

    fn require_writable(
        &self,
        source: &MosaicSource,
        operation: &'static str,
    ) -> Result<(), StoreError> {
        let store = self.registry.store();
        if store.is_writable(&source.location) {
            Ok(())
        } else {
            Err(StoreError::Unsupported {
                store: store.name_for(&source.location),
                operation,
            })
        }
    }
}
