use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Child account; always belongs to exactly one household
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Member {
    pub id: i32,
    pub name: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub household_id: i32,
    pub user_id: i32,
    pub total_score: i32,
}

#[derive(Debug, Clone)]
pub struct NewMember {
    pub name: String,
    pub username: String,
    /// Already hashed
    pub password: String,
    pub household_id: i32,
    pub user_id: i32,
}

/// Partial update; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct MemberChanges {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl MemberChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.username.is_none() && self.password.is_none()
    }
}
