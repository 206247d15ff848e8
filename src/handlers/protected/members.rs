// handlers/protected/members.rs - household membership and member task boards

use axum::{extract::State, Extension};
use serde::Deserialize;

use crate::api::AppState;
use crate::auth::Principal;
use crate::database::models::{Member, MemberChanges, Task};
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct MemberRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MemberDeleteRequest {
    pub member_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteTaskRequest {
    #[serde(rename = "taskId")]
    pub task_id: Option<i32>,
}

/// GET /api/households/:household_id/members
pub async fn members_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(household_id): ApiPath<i32>,
) -> ApiResult<Vec<Member>> {
    Ok(ApiResponse::success(state.households.list_members(&principal, household_id).await?))
}

/// POST /api/households/:household_id/members - Add a member account
///
/// Expected Input:
/// ```json
/// { "name": "Kid 1", "username": "kid1", "password": "kid1" }
/// ```
///
/// The member starts at level 1 with no points. Responds 201.
pub async fn members_post(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(household_id): ApiPath<i32>,
    ApiJson(body): ApiJson<MemberRequest>,
) -> ApiResult<Member> {
    let member = state
        .households
        .add_member(&principal, household_id, body.name, body.username, body.password)
        .await?;
    Ok(ApiResponse::created(member))
}

/// DELETE /api/households/:household_id/members - Body `{ "member_id": 4 }`
pub async fn members_delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(household_id): ApiPath<i32>,
    ApiJson(body): ApiJson<MemberDeleteRequest>,
) -> ApiResult<()> {
    state
        .households
        .remove_member(&principal, household_id, body.member_id)
        .await?;
    Ok(ApiResponse::no_content())
}

/// PATCH /api/households/:household_id/members/:member_id
pub async fn member_patch(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath((household_id, member_id)): ApiPath<(i32, i32)>,
    ApiJson(body): ApiJson<MemberRequest>,
) -> ApiResult<Member> {
    let changes = MemberChanges {
        name: body.name,
        username: body.username,
        password: body.password,
    };
    let member = state
        .households
        .update_member(&principal, household_id, member_id, changes)
        .await?;
    Ok(ApiResponse::success(member))
}

/// GET /api/households/:household_id/members/:member_id/tasks - The member's assigned tasks
pub async fn member_tasks_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath((household_id, member_id)): ApiPath<(i32, i32)>,
) -> ApiResult<Vec<Task>> {
    let tasks = state
        .households
        .member_tasks(&principal, household_id, member_id)
        .await?;
    Ok(ApiResponse::success(tasks))
}

/// PATCH /api/households/:household_id/members/:member_id/tasks - Body `{ "taskId": 7 }`
pub async fn member_tasks_patch(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath((household_id, member_id)): ApiPath<(i32, i32)>,
    ApiJson(body): ApiJson<CompleteTaskRequest>,
) -> ApiResult<()> {
    state
        .households
        .complete_task(&principal, household_id, member_id, body.task_id)
        .await?;
    Ok(ApiResponse::no_content())
}
