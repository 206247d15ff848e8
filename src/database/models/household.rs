use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Household {
    pub id: i32,
    pub name: String,
    pub user_id: i32,
}

#[derive(Debug, Clone)]
pub struct NewHousehold {
    pub name: String,
    pub user_id: i32,
}
