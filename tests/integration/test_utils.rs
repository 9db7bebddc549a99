//! Test utilities for integration tests.
//!
//! Footprint fixtures, GeoJSON builders and a document store that counts
//! reads.

use async_trait::async_trait;
use bytes::Bytes;
use geo::{coord, Rect};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mosaic_streamer::error::StoreError;
use mosaic_streamer::{DocumentStore, Footprint, MemoryStore};

// =============================================================================
// Footprint Fixtures
// =============================================================================

/// Rectangular footprint from `[minx, miny, maxx, maxy]`.
pub fn rect_footprint(id: &str, bounds: [f64; 4]) -> Footprint {
    let rect = Rect::new(
        coord! { x: bounds[0], y: bounds[1] },
        coord! { x: bounds[2], y: bounds[3] },
    );
    Footprint::new(id, rect.to_polygon())
}

/// Two overlapping scenes over western Europe.
pub fn europe_footprints() -> Vec<Footprint> {
    vec![
        rect_footprint("s3://scenes/a.tif", [0.0, 40.0, 10.0, 50.0]).with_zooms(5, 9),
        rect_footprint("s3://scenes/b.tif", [5.0, 45.0, 15.0, 55.0]).with_zooms(5, 9),
    ]
}

/// GeoJSON FeatureCollection for rectangles `(path, bounds, minzoom, maxzoom)`.
pub fn feature_collection(features: &[(&str, [f64; 4], u8, u8)]) -> Vec<u8> {
    let features: Vec<_> = features
        .iter()
        .map(|(path, b, minzoom, maxzoom)| {
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [b[0], b[1]], [b[2], b[1]], [b[2], b[3]], [b[0], b[3]], [b[0], b[1]]
                    ]]
                },
                "properties": {
                    "path": path,
                    "minzoom": minzoom,
                    "maxzoom": maxzoom,
                    "datatype": "uint8"
                }
            })
        })
        .collect();

    serde_json::to_vec(&json!({ "type": "FeatureCollection", "features": features }))
        .unwrap()
}

// =============================================================================
// Counting Store
// =============================================================================

/// Writable in-memory store that counts reads.
#[derive(Clone)]
pub struct CountingStore {
    inner: Arc<MemoryStore>,
    reads: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryStore::new()),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub async fn insert(&self, location: &str, body: impl Into<Bytes>) {
        self.inner.write(location, body.into()).await.unwrap();
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn is_writable(&self, location: &str) -> bool {
        self.inner.is_writable(location)
    }

    async fn read(&self, location: &str) -> Result<Bytes, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(location).await
    }

    async fn write(&self, location: &str, body: Bytes) -> Result<(), StoreError> {
        self.inner.write(location, body).await
    }
}
