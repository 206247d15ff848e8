// handlers/protected/auth.rs - token refresh

use axum::{extract::State, Extension};

use crate::api::AppState;
use crate::auth::Principal;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::TokenResponse;

/// PUT /api/auth/token - Re-issue a parent token
pub async fn user_token_put(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<TokenResponse> {
    principal.require_parent()?;
    Ok(ApiResponse::success(state.auth.issue(&principal)?))
}

/// PUT /api/membersAuth/token - Re-issue a member token
pub async fn member_token_put(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<TokenResponse> {
    principal.require_member()?;
    Ok(ApiResponse::success(state.auth.issue(&principal)?))
}
