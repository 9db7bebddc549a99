//! Service integration tests: create, update and query through real stores.
//!
//! Tests verify:
//! - GeoJSON footprints to a gzip file on disk and back
//! - Update ordering (add first / add last)
//! - Registry caching and single-flight loading
//! - Read-only stores reject writes

use std::sync::Arc;

use mosaic_streamer::footprint::{find_zooms, footprints_from_geojson};
use mosaic_streamer::grid::Tile;
use mosaic_streamer::{
    BuildOptions, MosaicError, MosaicJson, MosaicRegistry, MosaicService, MosaicSource,
    StoreError, StoreRouter,
};

use super::test_utils::{europe_footprints, feature_collection, rect_footprint, CountingStore};

// =============================================================================
// File Store Round Trip
// =============================================================================

#[tokio::test]
async fn test_create_from_geojson_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let geojson_path = dir.path().join("footprints.geojson");
    let mosaic_path = dir.path().join("out").join("mosaic.json.gz");

    std::fs::write(
        &geojson_path,
        feature_collection(&[
            ("a.tif", [0.0, 40.0, 10.0, 50.0], 6, 10),
            ("b.tif", [5.0, 45.0, 15.0, 55.0], 7, 12),
        ]),
    )
    .unwrap();

    let service = MosaicService::new(StoreRouter::new());
    let body = tokio::fs::read(&geojson_path).await.unwrap();
    let footprints = footprints_from_geojson(&body).unwrap();

    let (minzoom, maxzoom) = find_zooms(&footprints, None, None).unwrap();
    assert_eq!((minzoom, maxzoom), (7, 12));

    let source = MosaicSource::new(mosaic_path.to_string_lossy());
    let doc = service
        .create(&source, &footprints, minzoom, maxzoom, &BuildOptions::default())
        .await
        .unwrap();

    // Written compressed because of the suffix
    let raw = std::fs::read(&mosaic_path).unwrap();
    assert_eq!(&raw[..2], &[0x1f, 0x8b]);
    let decoded = MosaicJson::from_bytes(&raw, true, "mosaic.json.gz").unwrap();
    assert_eq!(decoded, doc);

    let assets = service.point(&source, 7.5, 47.5).await.unwrap();
    assert_eq!(assets, vec!["a.tif", "b.tif"]);

    let metadata = service.metadata(&source).await.unwrap();
    assert_eq!(metadata.minzoom, 7);
    assert_eq!(metadata.maxzoom, 12);
    assert_eq!(metadata.quadkey_zoom, 7);
}

#[tokio::test]
async fn test_gzip_override_reads_plain_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mosaic.json");
    let location = path.to_string_lossy().to_string();

    let service = MosaicService::new(StoreRouter::new());
    let forced = MosaicSource::new(&location).with_gzip(Some(true));
    service
        .create(&forced, &europe_footprints(), 5, 9, &BuildOptions::default())
        .await
        .unwrap();

    // Without the override the compressed bytes are not valid JSON
    let err = service.fetch(&MosaicSource::new(&location)).await.unwrap_err();
    assert!(matches!(err, MosaicError::Decode { .. }));

    assert!(service.fetch(&forced).await.is_ok());
}

// =============================================================================
// Update
// =============================================================================

#[tokio::test]
async fn test_update_add_first_and_add_last() {
    let service = MosaicService::new(StoreRouter::new());
    let first = MosaicSource::new("memory://first.json");
    let last = MosaicSource::new("memory://last.json");
    let base = vec![rect_footprint("old", [0.0, 40.0, 10.0, 50.0])];
    let addition = vec![rect_footprint("new", [0.0, 40.0, 10.0, 50.0])];

    for source in [&first, &last] {
        service
            .create(source, &base, 6, 8, &BuildOptions::default())
            .await
            .unwrap();
    }

    service
        .update(&first, &addition, true, &BuildOptions::default())
        .await
        .unwrap();
    service
        .update(&last, &addition, false, &BuildOptions::default())
        .await
        .unwrap();

    assert_eq!(service.point(&first, 5.0, 45.0).await.unwrap(), vec!["new", "old"]);
    assert_eq!(service.point(&last, 5.0, 45.0).await.unwrap(), vec!["old", "new"]);
}

#[tokio::test]
async fn test_update_widens_bounds_and_keeps_zooms() {
    let service = MosaicService::new(StoreRouter::new());
    let source = MosaicSource::new("memory://mosaic.json");
    service
        .create(&source, &europe_footprints(), 5, 9, &BuildOptions::default())
        .await
        .unwrap();

    let far = vec![rect_footprint("far.tif", [-80.0, 30.0, -70.0, 40.0])];
    let updated = service
        .update(&source, &far, true, &BuildOptions::default())
        .await
        .unwrap();

    assert_eq!(updated.minzoom, 5);
    assert_eq!(updated.maxzoom, 9);
    assert_eq!(updated.bounds, [-80.0, 30.0, 15.0, 55.0]);
    assert_eq!(service.point(&source, -75.0, 35.0).await.unwrap(), vec!["far.tif"]);
    assert_eq!(service.point(&source, 12.0, 52.0).await.unwrap(), vec!["s3://scenes/b.tif"]);
}

#[tokio::test]
async fn test_update_missing_mosaic() {
    let service = MosaicService::new(StoreRouter::new());
    let err = service
        .update(
            &MosaicSource::new("memory://missing.json"),
            &europe_footprints(),
            true,
            &BuildOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MosaicError::Store(StoreError::NotFound { .. })));
}

// =============================================================================
// Caching
// =============================================================================

#[tokio::test]
async fn test_repeated_lookups_read_once() {
    let store = CountingStore::new();
    let doc = mosaic_streamer::build(&europe_footprints(), 5, 9, &BuildOptions::default()).unwrap();
    store.insert("mosaic.json", doc.to_bytes(false).unwrap()).await;

    let service = MosaicService::new(store.clone());
    let source = MosaicSource::new("mosaic.json");

    for _ in 0..10 {
        service.point(&source, 7.5, 47.5).await.unwrap();
        service.metadata(&source).await.unwrap();
    }
    assert_eq!(store.read_count(), 1);

    // Each gzip flag is its own cache entry
    let forced = MosaicSource::new("mosaic.json").with_gzip(Some(false));
    service.fetch(&forced).await.unwrap();
    assert_eq!(store.read_count(), 2);
}

#[tokio::test]
async fn test_concurrent_lookups_share_one_load() {
    let store = CountingStore::new();
    let doc = mosaic_streamer::build(&europe_footprints(), 5, 9, &BuildOptions::default()).unwrap();
    store.insert("mosaic.json", doc.to_bytes(false).unwrap()).await;

    let service = MosaicService::new(store.clone());
    let source = Arc::new(MosaicSource::new("mosaic.json"));

    let tile = Tile::from_lng_lat(7.5, 47.5, 5).unwrap();
    let mut handles = Vec::new();
    for _ in 0..16 {
        let service = service.clone();
        let source = Arc::clone(&source);
        handles.push(tokio::spawn(async move {
            service.tile(&source, tile.x, tile.y, tile.z).await
        }));
    }

    for handle in handles {
        let assets = handle.await.unwrap().unwrap();
        assert_eq!(assets, vec!["s3://scenes/a.tif", "s3://scenes/b.tif"]);
    }
    assert_eq!(store.read_count(), 1);
}

#[tokio::test]
async fn test_eviction_reloads() {
    let store = CountingStore::new();
    let doc = mosaic_streamer::build(&europe_footprints(), 5, 9, &BuildOptions::default()).unwrap();
    let body = doc.to_bytes(false).unwrap();
    store.insert("one.json", body.clone()).await;
    store.insert("two.json", body).await;

    let service = MosaicService::with_registry(MosaicRegistry::with_capacity(store.clone(), 1));
    let one = MosaicSource::new("one.json");
    let two = MosaicSource::new("two.json");

    service.fetch(&one).await.unwrap();
    service.fetch(&two).await.unwrap();
    service.fetch(&one).await.unwrap();
    assert_eq!(store.read_count(), 3);
    assert_eq!(service.registry().cached_count().await, 1);
}

// =============================================================================
// Read-only Stores
// =============================================================================

#[tokio::test]
async fn test_s3_without_client_is_invalid_location() {
    let service = MosaicService::new(StoreRouter::new());
    let err = service
        .fetch(&MosaicSource::new("s3://bucket/mosaic.json"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MosaicError::Store(StoreError::InvalidLocation { .. })
    ));
}

#[tokio::test]
async fn test_http_create_is_unsupported() {
    let service = MosaicService::new(StoreRouter::new());
    let err = service
        .create(
            &MosaicSource::new("https://example.com/mosaic.json"),
            &europe_footprints(),
            5,
            9,
            &BuildOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(err.is_unsupported());
}
