use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A member's current rank joined with its badge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LevelState {
    pub level_id: i32,
    pub name: String,
    pub total_score: i32,
    pub badge: String,
}

/// Leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ScoreEntry {
    pub id: i32,
    pub name: String,
    pub total_score: i32,
}
