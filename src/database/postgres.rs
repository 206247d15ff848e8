use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    AccountHousehold, Household, LevelState, Member, MemberChanges, NewHousehold, NewMember,
    NewTask, NewUser, ScoreEntry, Task, TaskOverview, User,
};
use crate::database::repository::{ApplyOutcome, CredentialStore, HouseholdRepository};
use crate::scoring::{ScoreWrite, BASE_LEVEL};
use crate::types::TaskStatus;

const MEMBER_COLUMNS: &str = "id, name, username, password, household_id, user_id, total_score";
const TASK_COLUMNS: &str = "id, title, household_id, user_id, member_id, points, status";

/// Postgres-backed credential store and household repository
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run one write inside the batch. `Some(outcome)` means the write matched
    /// nothing and the batch has to be rolled back with that outcome.
    async fn apply_write(
        tx: &mut Transaction<'_, Postgres>,
        expected_score: Option<i32>,
        write: &ScoreWrite,
    ) -> Result<Option<ApplyOutcome>, DatabaseError> {
        let (result, task_id) = match write {
            ScoreWrite::DeleteTask { task_id, expected } => {
                let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND status = $2")
                    .bind(task_id)
                    .bind(expected.as_str())
                    .execute(&mut **tx)
                    .await?;
                (result, Some(*task_id))
            }
            ScoreWrite::SetTaskStatus { task_id, expected, status } => {
                let result = sqlx::query("UPDATE tasks SET status = $3 WHERE id = $1 AND status = $2")
                    .bind(task_id)
                    .bind(expected.as_str())
                    .bind(status.as_str())
                    .execute(&mut **tx)
                    .await?;
                (result, Some(*task_id))
            }
            ScoreWrite::UpdateLevel { member_id, level } => {
                let result = sqlx::query("UPDATE levels_members SET level_id = $2 WHERE member_id = $1")
                    .bind(member_id)
                    .bind(level)
                    .execute(&mut **tx)
                    .await?;
                (result, None)
            }
            ScoreWrite::UpdatePoints { member_id, score } => {
                let result = match expected_score {
                    Some(expected) => {
                        sqlx::query(
                            "UPDATE members SET total_score = $2 WHERE id = $1 AND total_score = $3",
                        )
                        .bind(member_id)
                        .bind(score)
                        .bind(expected)
                        .execute(&mut **tx)
                        .await?
                    }
                    None => {
                        sqlx::query("UPDATE members SET total_score = $2 WHERE id = $1")
                            .bind(member_id)
                            .bind(score)
                            .execute(&mut **tx)
                            .await?
                    }
                };
                (result, None)
            }
        };

        if result.rows_affected() > 0 {
            return Ok(None);
        }
        let Some(task_id) = task_id else {
            return Ok(Some(ApplyOutcome::Stale));
        };

        let still_there: Option<(i32,)> = sqlx::query_as("SELECT id FROM tasks WHERE id = $1")
            .bind(task_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(Some(match still_there {
            Some(_) => ApplyOutcome::StatusChanged,
            None => ApplyOutcome::TaskMissing,
        }))
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, name, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn user_exists(&self, username: &str) -> Result<bool, DatabaseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = $1")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 > 0)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, password, name) VALUES ($1, $2, $3)
             RETURNING id, username, password, name, created_at",
        )
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.name)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_member_by_username(&self, username: &str) -> Result<Option<Member>, DatabaseError> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn member_exists(&self, username: &str) -> Result<bool, DatabaseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM members WHERE username = $1")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 > 0)
    }
}

#[async_trait]
impl HouseholdRepository for PgStore {
    async fn insert_household(&self, household: NewHousehold) -> Result<Household, DatabaseError> {
        let household = sqlx::query_as::<_, Household>(
            "INSERT INTO households (name, user_id) VALUES ($1, $2) RETURNING id, name, user_id",
        )
        .bind(&household.name)
        .bind(household.user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(household)
    }

    async fn households_for_user(&self, user_id: i32) -> Result<Vec<Household>, DatabaseError> {
        let households = sqlx::query_as::<_, Household>(
            "SELECT id, name, user_id FROM households WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(households)
    }

    async fn find_household(&self, household_id: i32) -> Result<Option<Household>, DatabaseError> {
        let household =
            sqlx::query_as::<_, Household>("SELECT id, name, user_id FROM households WHERE id = $1")
                .bind(household_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(household)
    }

    async fn rename_household(&self, household_id: i32, name: &str) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE households SET name = $2 WHERE id = $1")
            .bind(household_id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_household(&self, household_id: i32) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM households WHERE id = $1")
            .bind(household_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn account_summary(&self, user_id: i32) -> Result<Vec<AccountHousehold>, DatabaseError> {
        let rows = sqlx::query_as::<_, AccountHousehold>(
            "SELECT users.name AS user, households.id AS household_id, households.name AS housename
             FROM users
             JOIN households ON households.user_id = users.id
             WHERE users.id = $1
             ORDER BY households.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn members_for_user(&self, user_id: i32) -> Result<Vec<Member>, DatabaseError> {
        let members = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    async fn members_in_household(&self, household_id: i32) -> Result<Vec<Member>, DatabaseError> {
        let members = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE household_id = $1 ORDER BY id"
        ))
        .bind(household_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    async fn find_member(&self, member_id: i32) -> Result<Option<Member>, DatabaseError> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1"
        ))
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn insert_member(&self, member: NewMember) -> Result<Member, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let member = sqlx::query_as::<_, Member>(&format!(
            "INSERT INTO members (name, username, password, household_id, user_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(&member.name)
        .bind(&member.username)
        .bind(&member.password)
        .bind(member.household_id)
        .bind(member.user_id)
        .fetch_one(&mut *tx)
        .await?;

        // The level row can only be written once the member id exists
        sqlx::query("INSERT INTO levels_members (level_id, member_id) VALUES ($1, $2)")
            .bind(BASE_LEVEL)
            .bind(member.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(member)
    }

    async fn update_member(
        &self,
        member_id: i32,
        changes: MemberChanges,
    ) -> Result<Option<Member>, DatabaseError> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "UPDATE members SET
                name = COALESCE($2, name),
                username = COALESCE($3, username),
                password = COALESCE($4, password)
             WHERE id = $1
             RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(member_id)
        .bind(changes.name)
        .bind(changes.username)
        .bind(changes.password)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn delete_member(&self, member_id: i32) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(member_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_task(&self, task: NewTask) -> Result<Task, DatabaseError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks (title, household_id, user_id, member_id, points)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(&task.title)
        .bind(task.household_id)
        .bind(task.user_id)
        .bind(task.member_id)
        .bind(task.points)
        .fetch_one(&self.pool)
        .await?;
        Ok(task)
    }

    async fn find_task(&self, task_id: i32) -> Result<Option<Task>, DatabaseError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn task_overview(&self, household_id: i32) -> Result<Vec<TaskOverview>, DatabaseError> {
        let rows = sqlx::query_as::<_, TaskOverview>(
            "SELECT members.id AS member_id, members.name, members.username, members.total_score,
                    tasks.id AS task_id, tasks.title, tasks.points, tasks.status
             FROM tasks
             RIGHT JOIN members ON members.id = tasks.member_id
             WHERE members.household_id = $1
             ORDER BY members.id, tasks.id",
        )
        .bind(household_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn tasks_with_status(
        &self,
        household_id: i32,
        status: TaskStatus,
    ) -> Result<Vec<Task>, DatabaseError> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE household_id = $1 AND status = $2 ORDER BY id"
        ))
        .bind(household_id)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    async fn assigned_tasks_for_member(
        &self,
        household_id: i32,
        member_id: i32,
    ) -> Result<Vec<Task>, DatabaseError> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE household_id = $1 AND member_id = $2 AND status = 'assigned'
             ORDER BY id"
        ))
        .bind(household_id)
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    async fn update_task_points(&self, task_id: i32, points: i32) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE tasks SET points = $2 WHERE id = $1")
            .bind(task_id)
            .bind(points)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_task_title(&self, task_id: i32, title: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE tasks SET title = $2 WHERE id = $1")
            .bind(task_id)
            .bind(title)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn complete_task(
        &self,
        member_id: i32,
        household_id: i32,
        task_id: i32,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE tasks SET status = 'completed'
             WHERE id = $1 AND member_id = $2 AND household_id = $3 AND status = 'assigned'",
        )
        .bind(task_id)
        .bind(member_id)
        .bind(household_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_task(&self, task_id: i32) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn level_state(&self, member_id: i32) -> Result<Option<LevelState>, DatabaseError> {
        let state = sqlx::query_as::<_, LevelState>(
            "SELECT levels_members.level_id, members.name, members.total_score, levels.badge
             FROM levels_members
             JOIN levels ON levels.id = levels_members.level_id
             JOIN members ON members.id = levels_members.member_id
             WHERE levels_members.member_id = $1",
        )
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(state)
    }

    async fn apply_writes(
        &self,
        expected_score: Option<i32>,
        writes: &[ScoreWrite],
    ) -> Result<ApplyOutcome, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        for write in writes {
            if let Some(outcome) = Self::apply_write(&mut tx, expected_score, write).await? {
                debug!("Rolling back score writes: {:?} on {:?}", outcome, write);
                tx.rollback().await?;
                return Ok(outcome);
            }
        }

        tx.commit().await?;
        Ok(ApplyOutcome::Applied)
    }

    async fn household_scores(&self, household_id: i32) -> Result<Vec<ScoreEntry>, DatabaseError> {
        let scores = sqlx::query_as::<_, ScoreEntry>(
            "SELECT id, name, total_score FROM members
             WHERE household_id = $1
             ORDER BY total_score DESC, id",
        )
        .bind(household_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(scores)
    }

    async fn reset_scores(&self, household_id: i32) -> Result<u64, DatabaseError> {
        let result = sqlx::query("UPDATE members SET total_score = 0 WHERE household_id = $1")
            .bind(household_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn reset_levels(&self, household_id: i32) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "UPDATE levels_members SET level_id = $2
             WHERE member_id IN (SELECT id FROM members WHERE household_id = $1)",
        )
        .bind(household_id)
        .bind(BASE_LEVEL)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
