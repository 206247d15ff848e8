use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::TaskStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub household_id: i32,
    pub user_id: i32,
    pub member_id: i32,
    pub points: i32,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub household_id: i32,
    pub user_id: i32,
    pub member_id: i32,
    pub points: i32,
}

/// Member joined with one of its tasks. Members without tasks appear once
/// with every task column empty.
#[derive(Debug, Clone, FromRow)]
pub struct TaskOverview {
    pub member_id: i32,
    pub name: String,
    pub username: String,
    pub total_score: i32,
    pub task_id: Option<i32>,
    pub title: Option<String>,
    pub points: Option<i32>,
    pub status: Option<String>,
}
