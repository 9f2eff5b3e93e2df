//! Error types for relluna-api
//!
//! `ReluminationError` is the pipeline taxonomy; every kind carries a stable
//! machine-readable code. `ApiError` is the HTTP boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::asset_resolver::AssetError;
use crate::services::quota_ledger::QuotaError;
use crate::services::renderer::RenderError;

/// Failure of a relumination request
#[derive(Debug, Error)]
pub enum ReluminationError {
    /// Free-tier monthly limit reached and no paid credits
    #[error("Relumination limit of the free beta plan reached this month ({used}/{limit})")]
    QuotaExceeded { used: i64, limit: i64 },

    /// Memory already relumed and the user may not re-render it
    #[error("This memory already has a relumination; the free plan allows one per memory")]
    AlreadyRelumed,

    /// Claimed-local image missing on disk
    #[error("Local image file not found for this memory: {0}")]
    AssetNotFound(String),

    #[error("Timed out downloading the remote image: {0}")]
    AssetFetchTimeout(String),

    #[error("Failed to download the source image: {0}")]
    AssetFetchFailed(String),

    #[error("Relumination render failed: {0}")]
    RenderFailed(String),

    /// Memory has no media reference at all
    #[error("Memory has no media to relume")]
    MissingMedia,

    #[error("Memory not found: {0}")]
    MemoryNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Unknown relumination style: {0}")]
    InvalidStyle(i64),

    #[error(transparent)]
    Common(#[from] relluna_common::Error),
}

impl ReluminationError {
    /// Stable error code for clients
    pub fn code(&self) -> &'static str {
        match self {
            ReluminationError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            ReluminationError::AlreadyRelumed => "ALREADY_RELUMED",
            ReluminationError::AssetNotFound(_) => "ASSET_NOT_FOUND",
            ReluminationError::AssetFetchTimeout(_) => "ASSET_FETCH_TIMEOUT",
            ReluminationError::AssetFetchFailed(_) => "ASSET_FETCH_FAILED",
            ReluminationError::RenderFailed(_) => "RENDER_FAILED",
            ReluminationError::MissingMedia => "MISSING_MEDIA",
            ReluminationError::MemoryNotFound(_) | ReluminationError::UserNotFound(_) => {
                "NOT_FOUND"
            }
            ReluminationError::InvalidStyle(_) => "BAD_REQUEST",
            ReluminationError::Common(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ReluminationError::QuotaExceeded { .. } => StatusCode::PAYMENT_REQUIRED,
            ReluminationError::AlreadyRelumed => StatusCode::CONFLICT,
            ReluminationError::AssetNotFound(_)
            | ReluminationError::MissingMedia
            | ReluminationError::InvalidStyle(_) => StatusCode::BAD_REQUEST,
            ReluminationError::AssetFetchTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ReluminationError::AssetFetchFailed(_) => StatusCode::BAD_GATEWAY,
            ReluminationError::MemoryNotFound(_) | ReluminationError::UserNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ReluminationError::RenderFailed(_) | ReluminationError::Common(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<QuotaError> for ReluminationError {
    fn from(err: QuotaError) -> Self {
        match err {
            QuotaError::QuotaExceeded { used, limit } => {
                ReluminationError::QuotaExceeded { used, limit }
            }
            QuotaError::UserNotFound(id) => ReluminationError::UserNotFound(id),
            QuotaError::Contention { attempts } => ReluminationError::Common(
                relluna_common::Error::Internal(format!(
                    "Quota update lost {} compare-and-swap attempts",
                    attempts
                )),
            ),
            QuotaError::Store(e) => ReluminationError::Common(e),
        }
    }
}

impl From<AssetError> for ReluminationError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::NotFound(path) => ReluminationError::AssetNotFound(path),
            AssetError::Timeout(url) => ReluminationError::AssetFetchTimeout(url),
            AssetError::Upstream(msg) => ReluminationError::AssetFetchFailed(msg),
            AssetError::Io(e) => ReluminationError::Common(relluna_common::Error::Io(e)),
        }
    }
}

impl From<RenderError> for ReluminationError {
    fn from(err: RenderError) -> Self {
        ReluminationError::RenderFailed(err.to_string())
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Caller identity missing (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Relumination pipeline error (status depends on kind)
    #[error(transparent)]
    Relumination(#[from] ReluminationError),

    /// relluna-common error
    #[error("Common error: {0}")]
    Common(#[from] relluna_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Relumination(ref err) => (err.status(), err.code(), err.to_string()),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
