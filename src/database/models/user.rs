use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Parent account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    /// Already hashed
    pub password: String,
    pub name: String,
}

/// One row of the parent account summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AccountHousehold {
    pub user: String,
    #[serde(rename = "householdId")]
    pub household_id: i32,
    pub housename: String,
}
