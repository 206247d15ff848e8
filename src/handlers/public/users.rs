// handlers/public/users.rs - POST /api/users

use axum::extract::State;
use serde::Deserialize;

use crate::api::AppState;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::RegisteredUser;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// POST /api/users - Register a parent account
///
/// Expected Input:
/// ```json
/// { "name": "Dunder Mifflin", "username": "dunder", "password": "11AAaa!!" }
/// ```
///
/// Responds 201 with `{ id, name, username }`. Missing fields are reported in
/// the order name, username, password.
pub async fn users_post(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> ApiResult<RegisteredUser> {
    let user = state
        .auth
        .register_user(body.name, body.username, body.password)
        .await?;
    Ok(ApiResponse::created(user))
}
