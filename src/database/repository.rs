use async_trait::async_trait;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    AccountHousehold, Household, LevelState, Member, MemberChanges, NewHousehold, NewMember,
    NewTask, NewUser, ScoreEntry, Task, TaskOverview, User,
};
use crate::scoring::ScoreWrite;
use crate::types::TaskStatus;

/// Result of applying a batch of score writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The member's score moved since it was read; nothing was written
    Stale,
    /// A task the batch deletes or updates no longer exists; nothing was written
    TaskMissing,
    /// A task the batch touches left the status it was planned from; nothing was written
    StatusChanged,
}

/// Lookup and creation of the two credential domains
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;

    async fn user_exists(&self, username: &str) -> Result<bool, DatabaseError>;

    async fn insert_user(&self, user: NewUser) -> Result<User, DatabaseError>;

    async fn find_member_by_username(&self, username: &str) -> Result<Option<Member>, DatabaseError>;

    async fn member_exists(&self, username: &str) -> Result<bool, DatabaseError>;
}

/// Households, members, tasks and the level table
#[async_trait]
pub trait HouseholdRepository: Send + Sync {
    // Households
    async fn insert_household(&self, household: NewHousehold) -> Result<Household, DatabaseError>;

    async fn households_for_user(&self, user_id: i32) -> Result<Vec<Household>, DatabaseError>;

    async fn find_household(&self, household_id: i32) -> Result<Option<Household>, DatabaseError>;

    async fn rename_household(&self, household_id: i32, name: &str) -> Result<(), DatabaseError>;

    async fn delete_household(&self, household_id: i32) -> Result<(), DatabaseError>;

    async fn account_summary(&self, user_id: i32) -> Result<Vec<AccountHousehold>, DatabaseError>;

    // Members
    async fn members_for_user(&self, user_id: i32) -> Result<Vec<Member>, DatabaseError>;

    async fn members_in_household(&self, household_id: i32) -> Result<Vec<Member>, DatabaseError>;

    async fn find_member(&self, member_id: i32) -> Result<Option<Member>, DatabaseError>;

    /// Creates the member and places it at the base level
    async fn insert_member(&self, member: NewMember) -> Result<Member, DatabaseError>;

    async fn update_member(
        &self,
        member_id: i32,
        changes: MemberChanges,
    ) -> Result<Option<Member>, DatabaseError>;

    async fn delete_member(&self, member_id: i32) -> Result<bool, DatabaseError>;

    // Tasks
    async fn insert_task(&self, task: NewTask) -> Result<Task, DatabaseError>;

    async fn find_task(&self, task_id: i32) -> Result<Option<Task>, DatabaseError>;

    async fn task_overview(&self, household_id: i32) -> Result<Vec<TaskOverview>, DatabaseError>;

    async fn tasks_with_status(
        &self,
        household_id: i32,
        status: TaskStatus,
    ) -> Result<Vec<Task>, DatabaseError>;

    async fn assigned_tasks_for_member(
        &self,
        household_id: i32,
        member_id: i32,
    ) -> Result<Vec<Task>, DatabaseError>;

    async fn update_task_points(&self, task_id: i32, points: i32) -> Result<bool, DatabaseError>;

    async fn update_task_title(&self, task_id: i32, title: &str) -> Result<bool, DatabaseError>;

    /// Marks an assigned task completed, scoped to the member and household
    async fn complete_task(
        &self,
        member_id: i32,
        household_id: i32,
        task_id: i32,
    ) -> Result<bool, DatabaseError>;

    async fn delete_task(&self, task_id: i32) -> Result<bool, DatabaseError>;

    // Levels and scores
    async fn level_state(&self, member_id: i32) -> Result<Option<LevelState>, DatabaseError>;

    /// Apply writes planned by the scoring engine atomically. When
    /// `expected_score` is set, points are only written if the member still
    /// holds that score.
    async fn apply_writes(
        &self,
        expected_score: Option<i32>,
        writes: &[ScoreWrite],
    ) -> Result<ApplyOutcome, DatabaseError>;

    /// Leaderboard, highest score first
    async fn household_scores(&self, household_id: i32) -> Result<Vec<ScoreEntry>, DatabaseError>;

    async fn reset_scores(&self, household_id: i32) -> Result<u64, DatabaseError>;

    async fn reset_levels(&self, household_id: i32) -> Result<u64, DatabaseError>;
}
