//! relluna-api library interface
//!
//! Relumination service: turns a memory's photo and narrative into a short
//! captioned vertical video, metered by a per-user monthly quota.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::http::HeaderValue;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ServiceConfig;
use crate::services::ReluminationPipeline;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub pipeline: Arc<ReluminationPipeline>,
    pub config: Arc<ServiceConfig>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last internal failure, surfaced on /health
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, pipeline: ReluminationPipeline, config: ServiceConfig) -> Self {
        Self {
            db,
            pipeline: Arc::new(pipeline),
            config: Arc::new(config),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
///
/// Rendered videos are served as static files under the configured public path.
pub fn build_router(state: AppState) -> Router {
    let media_path = format!("/{}", state.config.render.public_path.trim_matches('/'));
    let media = ServeDir::new(&state.config.render.output_dir);
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .merge(api::health_routes())
        .merge(api::relumination_routes())
        .nest_service(&media_path, media)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
