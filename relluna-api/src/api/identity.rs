//! Caller identity
//!
//! Authentication happens upstream; the authenticated user's id arrives in
//! the `X-User-Id` header.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Id of the user making the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("missing X-User-Id header".to_string()))?;

        let user_id = value
            .to_str()
            .map_err(|_| ApiError::Unauthorized("X-User-Id header is not valid text".to_string()))?
            .trim();

        if user_id.is_empty() {
            return Err(ApiError::Unauthorized("empty X-User-Id header".to_string()));
        }

        Ok(CurrentUser(user_id.to_string()))
    }
}
