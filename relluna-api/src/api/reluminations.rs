//! Relumination endpoints
//!
//! - POST /memories/:memory_id/relume
//! - GET /reluminations/quota

use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::CurrentUser;
use crate::error::{ApiError, ApiResult, ReluminationError};
use crate::services::quota_ledger::QuotaStatus;
use crate::services::renderer::ReluminationStyle;
use crate::AppState;

/// Optional body of a relume request
#[derive(Debug, Default, Deserialize)]
pub struct RelumeRequest {
    pub style: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RelumeResponse {
    pub memory_id: String,
    pub relumination_url: String,
    pub relumination_style: i64,
}

/// POST /memories/:memory_id/relume
///
/// Body may be empty; `{"style": 1}` selects the style explicitly.
pub async fn relume_memory(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(memory_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<RelumeResponse>> {
    let request: RelumeRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RelumeRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid request body: {}", e)))?
    };

    let style = match request.style {
        None => ReluminationStyle::default(),
        Some(id) => ReluminationStyle::from_id(id).ok_or(ReluminationError::InvalidStyle(id))?,
    };

    info!(user_id = %user_id, memory_id = %memory_id, style = style.id(), "Relume requested");

    match state.pipeline.relume(&user_id, &memory_id, style).await {
        Ok(outcome) => Ok(Json(RelumeResponse {
            memory_id,
            relumination_url: outcome.url,
            relumination_style: outcome.style.id(),
        })),
        Err(err) => {
            if matches!(err, ReluminationError::RenderFailed(_) | ReluminationError::Common(_)) {
                *state.last_error.write().await = Some(err.to_string());
            }
            Err(err.into())
        }
    }
}

/// GET /reluminations/quota
pub async fn quota_status(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Json<QuotaStatus>> {
    let status = state
        .pipeline
        .ledger()
        .status(&user_id, relluna_common::time::now())
        .await
        .map_err(ReluminationError::from)?;

    Ok(Json(status))
}

pub fn relumination_routes() -> Router<AppState> {
    Router::new()
        .route("/memories/:memory_id/relume", post(relume_memory))
        .route("/reluminations/quota", get(quota_status))
}
