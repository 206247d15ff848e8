// handlers/protected/account.rs - "who am I" views for each principal kind

use axum::{extract::State, Extension};

use crate::api::AppState;
use crate::auth::Principal;
use crate::database::models::AccountHousehold;
use crate::middleware::{ApiResponse, ApiResult};
use crate::scoring::LevelProgress;

/// GET /api/users - Households owned by the calling parent
///
/// Expected Output:
/// ```json
/// { "success": true, "data": [ { "user": "Dunder Mifflin", "householdId": 1, "housename": "Scranton" } ] }
/// ```
pub async fn users_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<AccountHousehold>> {
    let summary = state.households.account_summary(&principal).await?;
    Ok(ApiResponse::success(summary))
}

/// GET /api/members - Level, score, badge and `nextLevel` gap of the calling member
pub async fn members_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<LevelProgress> {
    Ok(ApiResponse::success(state.households.level_progress(&principal).await?))
}
