// handlers/protected/households.rs - parent household management

use std::collections::BTreeMap;

use axum::{extract::State, Extension};
use serde::Deserialize;

use crate::api::AppState;
use crate::auth::Principal;
use crate::database::models::Household;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::services::HouseholdMembers;

#[derive(Debug, Deserialize)]
pub struct HouseholdRequest {
    pub name: Option<String>,
}

/// GET /api/households - Households owned by the calling parent
pub async fn households_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<Household>> {
    Ok(ApiResponse::success(state.households.list_households(&principal).await?))
}

/// POST /api/households - Create a household
///
/// Expected Input: `{ "name": "Scranton" }`
///
/// Responds 201 with `{ id, name, user_id }`.
pub async fn households_post(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(body): ApiJson<HouseholdRequest>,
) -> ApiResult<Household> {
    let household = state.households.create_household(&principal, body.name).await?;
    Ok(ApiResponse::created(household))
}

/// PATCH /api/households/:household_id - Rename; responds with the full household list
pub async fn household_patch(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(household_id): ApiPath<i32>,
    ApiJson(body): ApiJson<HouseholdRequest>,
) -> ApiResult<Vec<Household>> {
    let households = state
        .households
        .rename_household(&principal, household_id, body.name)
        .await?;
    Ok(ApiResponse::success(households))
}

/// DELETE /api/households/:household_id - Remove a household with its members and tasks
pub async fn household_delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(household_id): ApiPath<i32>,
) -> ApiResult<()> {
    state.households.delete_household(&principal, household_id).await?;
    Ok(ApiResponse::no_content())
}

/// GET /api/households/members - Members of every owned household
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "1": { "household_id": 1, "members": [ { "name": "Kid 1", "id": 4 } ] }
///   }
/// }
/// ```
pub async fn household_members_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<BTreeMap<i32, HouseholdMembers>> {
    Ok(ApiResponse::success(state.households.members_by_household(&principal).await?))
}
