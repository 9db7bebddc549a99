//! API integration tests for mosaic lookups and error handling.
//!
//! Tests verify:
//! - Health, info, document, tile and point endpoints
//! - Error cases (missing mosaic, invalid tile, bad coordinates, bad document)
//! - HTTP response codes and headers

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use mosaic_streamer::grid::Tile;
use mosaic_streamer::{
    build, create_router, BuildOptions, DocumentStore, MemoryStore, MosaicService, RouterConfig,
};

use super::test_utils::europe_footprints;

const MOSAIC: &str = "memory://europe.json";

async fn setup_router() -> Router {
    let store = MemoryStore::new();
    let doc = build(&europe_footprints(), 5, 9, &BuildOptions::default()).unwrap();
    store.write(MOSAIC, doc.to_bytes(false).unwrap()).await.unwrap();
    store
        .write("memory://broken.json", "{\"not\": \"a mosaic\"}".into())
        .await
        .unwrap();

    let config = RouterConfig::new().with_tracing(false).with_cache_max_age(600);
    create_router(MosaicService::new(store), config)
}

async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

// =============================================================================
// Successful Lookups
// =============================================================================

#[tokio::test]
async fn test_health() {
    let (status, body) = get_json(setup_router().await, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_info() {
    let (status, body) = get_json(setup_router().await, &format!("/info?url={MOSAIC}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["minzoom"], 5);
    assert_eq!(body["maxzoom"], 9);
    assert_eq!(body["quadkey_zoom"], 5);
    assert_eq!(body["mosaicid"].as_str().unwrap().len(), 56);
    assert!(body.get("tiles").is_none());
}

#[tokio::test]
async fn test_mosaicjson() {
    let (status, body) =
        get_json(setup_router().await, &format!("/mosaicjson?url={MOSAIC}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mosaicjson"], "0.0.2");
    assert!(body["tiles"].as_object().is_some_and(|tiles| !tiles.is_empty()));
}

#[tokio::test]
async fn test_tile_lookup_with_cache_header() {
    let router = setup_router().await;
    let tile = Tile::from_lng_lat(7.5, 47.5, 5).unwrap();

    let request = Request::builder()
        .uri(format!("/tiles/5/{}/{}?url={MOSAIC}", tile.x, tile.y))
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "public, max-age=600"
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        body["assets"],
        serde_json::json!(["s3://scenes/a.tif", "s3://scenes/b.tif"])
    );
}

#[tokio::test]
async fn test_tile_lookup_below_quadkey_zoom() {
    // z2 tile containing western Europe aggregates its z5 descendants
    let tile = Tile::from_lng_lat(7.5, 47.5, 2).unwrap();
    let (status, body) = get_json(
        setup_router().await,
        &format!("/tiles/2/{}/{}?url={MOSAIC}", tile.x, tile.y),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["assets"],
        serde_json::json!(["s3://scenes/a.tif", "s3://scenes/b.tif"])
    );
}

#[tokio::test]
async fn test_empty_tile() {
    let (status, body) =
        get_json(setup_router().await, &format!("/tiles/5/0/0?url={MOSAIC}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assets"], serde_json::json!([]));
}

#[tokio::test]
async fn test_point_lookup() {
    let (status, body) =
        get_json(setup_router().await, &format!("/point/12.0,52.0?url={MOSAIC}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["coordinates"], serde_json::json!([12.0, 52.0]));
    assert_eq!(body["assets"], serde_json::json!(["s3://scenes/b.tif"]));
}

// =============================================================================
// Error Cases
// =============================================================================

#[tokio::test]
async fn test_missing_mosaic() {
    let (status, body) =
        get_json(setup_router().await, "/info?url=memory://nothing.json").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn test_tile_outside_grid() {
    let (status, body) =
        get_json(setup_router().await, &format!("/tiles/2/4/0?url={MOSAIC}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn test_bad_coordinates() {
    let (status, body) =
        get_json(setup_router().await, &format!("/point/abc?url={MOSAIC}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn test_invalid_document() {
    let (status, body) =
        get_json(setup_router().await, "/info?url=memory://broken.json").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "decode_error");
}

#[tokio::test]
async fn test_missing_url_parameter() {
    let request = Request::builder()
        .uri("/tiles/5/0/0")
        .body(Body::empty())
        .unwrap();
    let response = setup_router().await.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
