// handlers/protected/scores.rs - leaderboard and reset

use axum::{extract::State, Extension};
use serde::Deserialize;

use crate::api::AppState;
use crate::auth::Principal;
use crate::database::models::ScoreEntry;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub household_id: Option<i32>,
}

/// GET /api/households/household/scores - Leaderboard of the calling member's household
pub async fn scores_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<ScoreEntry>> {
    Ok(ApiResponse::success(state.households.household_scores(&principal).await?))
}

/// PATCH /api/households/household/scores - Reset every score and level in a household
///
/// Expected Input: `{ "household_id": 1 }`. Answers with the zeroed leaderboard.
pub async fn scores_patch(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(body): ApiJson<ResetRequest>,
) -> ApiResult<Vec<ScoreEntry>> {
    let scores = state
        .households
        .reset_household(&principal, body.household_id)
        .await?;
    Ok(ApiResponse::success(scores))
}
