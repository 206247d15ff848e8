// handlers/protected/tasks.rs - task assignment, completion review and approval

use std::collections::BTreeMap;

use axum::{extract::State, Extension};
use serde::Deserialize;

use crate::api::AppState;
use crate::auth::Principal;
use crate::database::models::Task;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::scoring::LevelProgress;
use crate::services::{MemberTasks, TaskDecision, TaskDecisionOutcome, TaskEdit};

#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    pub title: Option<String>,
    pub member_id: Option<i32>,
    pub points: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

/// GET /api/households/:household_id/tasks - Tasks grouped by member id
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "4": {
///       "member_id": 4, "name": "Kid 1", "username": "kid1", "total_score": 20,
///       "tasks": [ { "title": "Wash dishes", "id": 9, "points": 10, "status": "completed" } ]
///     }
///   }
/// }
/// ```
pub async fn tasks_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(household_id): ApiPath<i32>,
) -> ApiResult<BTreeMap<i32, MemberTasks>> {
    Ok(ApiResponse::success(state.households.task_board(&principal, household_id).await?))
}

/// POST /api/households/:household_id/tasks - Assign a task to a member
pub async fn tasks_post(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(household_id): ApiPath<i32>,
    ApiJson(body): ApiJson<TaskRequest>,
) -> ApiResult<Task> {
    let task = state
        .households
        .create_task(&principal, household_id, body.title, body.member_id, body.points)
        .await?;
    Ok(ApiResponse::created(task))
}

/// PATCH /api/households/:household_id/tasks - Edit title or points
///
/// Expected Input: `{ "method": "points", "id": 9, "points": 15 }`
/// or `{ "method": "title", "id": 9, "title": "Dry dishes" }`
pub async fn tasks_patch(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(household_id): ApiPath<i32>,
    ApiJson(edit): ApiJson<TaskEdit>,
) -> ApiResult<&'static str> {
    let message = state.households.edit_task(&principal, household_id, edit).await?;
    Ok(ApiResponse::success(message))
}

/// GET /api/households/:household_id/tasks/status?status=completed
pub async fn tasks_status_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(household_id): ApiPath<i32>,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> ApiResult<Vec<Task>> {
    let tasks = state
        .households
        .tasks_with_status(&principal, household_id, query.status.as_deref())
        .await?;
    Ok(ApiResponse::success(tasks))
}

/// DELETE /api/households/:household_id/tasks/:task_id - Drop a task, scores untouched
pub async fn task_delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath((household_id, task_id)): ApiPath<(i32, i32)>,
) -> ApiResult<()> {
    state.households.delete_task(&principal, household_id, task_id).await?;
    Ok(ApiResponse::no_content())
}

/// GET /api/households/:household_id/tasks/status/:task_id - Calling member's level progress
pub async fn task_status_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<LevelProgress> {
    Ok(ApiResponse::success(state.households.level_progress(&principal).await?))
}

/// PATCH /api/households/:household_id/tasks/status/:task_id - Approve or reassign
///
/// Expected Input:
/// ```json
/// { "memberId": 4, "points": 10, "newStatus": "approved" }
/// ```
///
/// Approval answers with the member's new `{ level_id, name, total_score, badge, taskId }`.
/// Reassignment answers with the task, back in `assigned`.
pub async fn task_status_patch(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath((household_id, task_id)): ApiPath<(i32, i32)>,
    ApiJson(decision): ApiJson<TaskDecision>,
) -> ApiResult<TaskDecisionOutcome> {
    let outcome = state
        .households
        .decide_task(&principal, household_id, task_id, decision)
        .await?;
    Ok(ApiResponse::success(outcome))
}
