//! relluna-api - Relumination service
//!
//! Serves the relumination endpoints, the rendered videos, and health.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use relluna_api::config::{Cli, ServiceConfig};
use relluna_api::services::renderer::FfmpegEncoder;
use relluna_api::services::ReluminationPipeline;
use relluna_api::AppState;
use relluna_common::config::RootFolderInitializer;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Step 1: Resolve configuration (CLI → ENV → TOML → defaults)
    let config = ServiceConfig::resolve(&cli)?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting relluna-api (Relumination) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 2: Create root folder if missing, then open or create database
    RootFolderInitializer::new(config.root_folder.clone())
        .ensure_directory_exists()
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;
    info!("Database: {}", config.database_path.display());
    let db_pool = relluna_api::db::init_database_pool(&config.database_path).await?;
    info!("Database connection established");

    // Step 3: Renderer collaborators
    let encoder = FfmpegEncoder::new(config.render.ffmpeg_binary.clone());
    if !encoder.is_available() {
        warn!(
            binary = %config.render.ffmpeg_binary,
            "Video encoder not runnable; reluminations will fail until it is installed"
        );
    }
    std::fs::create_dir_all(&config.render.output_dir)?;
    info!("Relumination output: {}", config.render.output_dir.display());

    let pipeline = ReluminationPipeline::from_config(db_pool.clone(), &config, Arc::new(encoder))?;

    let bind_address = config.bind_address.clone();
    let state = AppState::new(db_pool, pipeline, config);
    let app = relluna_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
