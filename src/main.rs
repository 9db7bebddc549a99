//! Mosaic Streamer - build and query MosaicJSON documents.
//!
//! This binary wires the CLI to the mosaic service and the HTTP server.

use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mosaic_streamer::{
    config::{
        Cli, Command, CreateConfig, InfoConfig, PointConfig, ServeConfig, StorageArgs,
        TileConfig, UpdateConfig,
    },
    create_s3_client,
    footprint::{find_zooms, footprints_from_geojson, Footprint},
    server::{create_router, RouterConfig},
    DocumentStore, MosaicError, MosaicRegistry, MosaicService, MosaicSource, S3Store,
    StoreRouter,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Create(config) => run_create(config).await,
        Command::Update(config) => run_update(config).await,
        Command::Info(config) => run_info(config).await,
        Command::Tile(config) => run_tile(config).await,
        Command::Point(config) => run_point(config).await,
        Command::Serve(config) => run_serve(config).await,
    }
}

// =============================================================================
// Shared Setup
// =============================================================================

/// Build the cached mosaic service over every supported store.
async fn build_service(storage: &StorageArgs) -> MosaicService<StoreRouter> {
    let s3_client = create_s3_client(storage.s3_endpoint.as_deref(), &storage.s3_region).await;
    let router = StoreRouter::new().with_s3(S3Store::new(s3_client));
    MosaicService::with_registry(MosaicRegistry::with_capacity(router, storage.cache_mosaics))
}

/// Read and parse GeoJSON footprints from any supported location.
async fn load_footprints(
    service: &MosaicService<StoreRouter>,
    location: &str,
) -> Result<Vec<Footprint>, MosaicError> {
    let body = service.registry().store().read(location).await?;
    let footprints = footprints_from_geojson(&body)?;
    info!(location = %location, count = footprints.len(), "Loaded footprints");
    Ok(footprints)
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to encode output: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn fail(e: MosaicError) -> ExitCode {
    error!("{}", e);
    ExitCode::FAILURE
}

// =============================================================================
// Create / Update Commands
// =============================================================================

async fn run_create(config: CreateConfig) -> ExitCode {
    init_logging(config.storage.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let service = build_service(&config.storage).await;
    let footprints = match load_footprints(&service, &config.footprints).await {
        Ok(footprints) => footprints,
        Err(e) => return fail(e),
    };

    let (minzoom, maxzoom) =
        match find_zooms(&footprints, config.build.minzoom, config.build.maxzoom) {
            Ok(zooms) => zooms,
            Err(e) => return fail(e),
        };

    let source =
        MosaicSource::new(&config.output).with_gzip(config.storage.gzip_override());
    match service
        .create(&source, &footprints, minzoom, maxzoom, &config.build.options())
        .await
    {
        Ok(doc) => {
            info!(
                output = %config.output,
                minzoom,
                maxzoom,
                quadkey_zoom = doc.quadkey_zoom(),
                tiles = doc.tiles.len(),
                "Mosaic created"
            );
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

async fn run_update(config: UpdateConfig) -> ExitCode {
    init_logging(config.storage.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let service = build_service(&config.storage).await;
    let footprints = match load_footprints(&service, &config.footprints).await {
        Ok(footprints) => footprints,
        Err(e) => return fail(e),
    };

    let source = MosaicSource::new(&config.mosaic).with_gzip(config.storage.gzip_override());
    match service
        .update(&source, &footprints, !config.add_last, &config.build.options())
        .await
    {
        Ok(doc) => {
            info!(mosaic = %config.mosaic, tiles = doc.tiles.len(), "Mosaic updated");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

// =============================================================================
// Query Commands
// =============================================================================

#[derive(Serialize)]
struct InfoOutput {
    mosaicid: String,
    #[serde(flatten)]
    metadata: mosaic_streamer::MosaicMetadata,
}

async fn run_info(config: InfoConfig) -> ExitCode {
    init_logging(config.storage.verbose);

    if let Err(e) = config.storage.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let service = build_service(&config.storage).await;
    let source = MosaicSource::new(&config.mosaic).with_gzip(config.storage.gzip_override());

    let doc = match service.fetch(&source).await {
        Ok(doc) => doc,
        Err(e) => return fail(e),
    };
    let mosaicid = match doc.mosaic_id() {
        Ok(id) => id,
        Err(e) => return fail(e),
    };

    print_json(&InfoOutput {
        mosaicid,
        metadata: doc.metadata(),
    })
}

async fn run_tile(config: TileConfig) -> ExitCode {
    init_logging(config.storage.verbose);

    if let Err(e) = config.storage.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let service = build_service(&config.storage).await;
    let source = MosaicSource::new(&config.mosaic).with_gzip(config.storage.gzip_override());

    match service.tile(&source, config.x, config.y, config.z).await {
        Ok(assets) => print_json(&assets),
        Err(e) => fail(e),
    }
}

async fn run_point(config: PointConfig) -> ExitCode {
    init_logging(config.storage.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let service = build_service(&config.storage).await;
    let source = MosaicSource::new(&config.mosaic).with_gzip(config.storage.gzip_override());

    match service.point(&source, config.lng, config.lat).await {
        Ok(assets) => print_json(&assets),
        Err(e) => fail(e),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.storage.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Mosaic Streamer v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    if let Some(ref endpoint) = config.storage.s3_endpoint {
        info!("  S3 endpoint: {}", endpoint);
    }
    info!("  S3 region: {}", config.storage.s3_region);
    info!("  Cache: {} mosaics", config.storage.cache_mosaics);
    info!("  Cache-Control max-age: {}s", config.cache_max_age);

    let service = build_service(&config.storage).await;
    let router = create_router(service, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("    curl http://{}/health", addr);
    info!("    curl 'http://{}/info?url=<mosaic>'", addr);
    info!("    curl 'http://{}/tiles/<z>/<x>/<y>?url=<mosaic>'", addr);
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
///
/// Logs go to stderr so query output on stdout stays parseable.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "mosaic_streamer=debug,tower_http=debug"
    } else {
        "mosaic_streamer=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new().with_cache_max_age(config.cache_max_age);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}
