//! HTTP store integration tests against a local server.
//!
//! Tests verify:
//! - Documents load over HTTP, plain and gzip compressed
//! - 404 and 403 responses map to NotFound and Auth with their status
//! - Other failures map to Status with the response body

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use bytes::Bytes;

use mosaic_streamer::{
    build, BuildOptions, DocumentStore, HttpStore, MosaicError, MosaicService, MosaicSource,
    StoreError, StoreRouter,
};

use super::test_utils::europe_footprints;

/// Serve fixed responses on an ephemeral port and return the base URL.
async fn spawn_server() -> String {
    let doc = build(&europe_footprints(), 5, 9, &BuildOptions::default()).unwrap();
    let plain = doc.to_bytes(false).unwrap();
    let gzipped = doc.to_bytes(true).unwrap();

    let app = Router::new()
        .route("/mosaic.json", get(move || {
            let body = plain.clone();
            async move { body }
        }))
        .route("/mosaic.json.gz", get(move || {
            let body = gzipped.clone();
            async move { body }
        }))
        .route(
            "/private.json",
            get(|| async { (StatusCode::FORBIDDEN, "access denied") }),
        )
        .route(
            "/broken.json",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "try later") }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_http_read_success() {
    let base = spawn_server().await;
    let store = HttpStore::new();

    let body: Bytes = store.read(&format!("{base}/mosaic.json")).await.unwrap();
    assert!(body.starts_with(b"{"));
}

#[tokio::test]
async fn test_http_lookup_plain_and_gzip() {
    let base = spawn_server().await;
    let service = MosaicService::new(StoreRouter::new());

    for path in ["mosaic.json", "mosaic.json.gz"] {
        let source = MosaicSource::new(format!("{base}/{path}"));
        let assets = service.point(&source, 7.5, 47.5).await.unwrap();
        assert_eq!(assets, vec!["s3://scenes/a.tif", "s3://scenes/b.tif"]);
    }
}

#[tokio::test]
async fn test_http_not_found() {
    let base = spawn_server().await;
    let store = HttpStore::new();

    let err = store.read(&format!("{base}/missing.json")).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { status: Some(404), .. }));
    assert!(!err.is_client_side());
}

#[tokio::test]
async fn test_http_forbidden() {
    let base = spawn_server().await;
    let store = HttpStore::new();

    let err = store.read(&format!("{base}/private.json")).await.unwrap_err();
    assert!(matches!(err, StoreError::Auth { status: Some(403), .. }));
}

#[tokio::test]
async fn test_http_server_error_keeps_body() {
    let base = spawn_server().await;
    let service = MosaicService::new(StoreRouter::new());

    let err = service
        .fetch(&MosaicSource::new(format!("{base}/broken.json")))
        .await
        .unwrap_err();

    match err {
        MosaicError::Store(StoreError::Status { status, body, .. }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "try later");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
