//! Server binary - wires the adapters into the merge service and serves HTTP.

use clipjoin::domain::av::cmd::RealFfmpegRunner;
use clipjoin::{build_router, AppState, FsAdapter, MergeService, ReqwestFetcher, ServerConfig};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // RUST_LOG may come from .env, and config warnings need a subscriber
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_env();

    info!(
        ffmpeg = ?config.ffmpeg.path,
        source = ?config.ffmpeg.source,
        "resolved ffmpeg"
    );

    // 1. Adapters
    let fetcher = match ReqwestFetcher::new(config.download_timeout) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!(error = %e, "failed to build HTTP client");
            std::process::exit(1);
        }
    };

    let storage = FsAdapter::new(&config.output_dir);
    if let Err(e) = storage.prepare().await {
        error!(dir = ?config.output_dir, error = %e, "failed to create output directory");
        std::process::exit(1);
    }

    let runner = RealFfmpegRunner::new(config.ffmpeg.clone(), config.ffmpeg_timeout);

    // 2. Application Service
    let service = Arc::new(MergeService::new(
        fetcher,
        storage,
        runner,
        config.work_dir.clone(),
    ));

    // 3. HTTP Layer
    let app = build_router(
        AppState {
            service,
            public_base_url: config.public_base_url.clone(),
            service_name: config.service_name.clone(),
        },
        config.max_body_bytes,
    );

    // 4. Start Server
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.addr, config.port))
        .await
        .expect("Failed to bind TCP listener");
    info!("Listening at {}:{}", config.addr, config.port);
    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
