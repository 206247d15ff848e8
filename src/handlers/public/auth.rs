// handlers/public/auth.rs - token acquisition for parents and members

use axum::extract::State;
use serde::Deserialize;

use crate::api::AppState;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::TokenResponse;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// POST /api/auth/token - Parent login
///
/// Expected Input:
/// ```json
/// { "username": "dunder", "password": "11AAaa!!" }
/// ```
///
/// Expected Output:
/// ```json
/// { "success": true, "data": { "authToken": "eyJhbGciOiJIUzI1NiI...", "type": "user" } }
/// ```
///
/// Unknown usernames and wrong passwords both answer 400
/// "Incorrect username or password".
pub async fn user_token_post(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<TokenResponse> {
    let token = state.auth.login_user(body.username, body.password).await?;
    Ok(ApiResponse::success(token))
}

/// POST /api/membersAuth/token - Member login, same shape as the parent login
/// with `"type": "member"` in the response.
pub async fn member_token_post(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<TokenResponse> {
    let token = state.auth.login_member(body.username, body.password).await?;
    Ok(ApiResponse::success(token))
}
