use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{hash_password, validate_member_password, Principal};
use crate::database::models::{
    AccountHousehold, Household, Member, MemberChanges, NewHousehold, NewMember, NewTask,
    ScoreEntry, Task,
};
use crate::database::{ApplyOutcome, CredentialStore, HouseholdRepository};
use crate::sanitize::{escape_html, Escaped};
use crate::scoring::{self, LevelProgress};
use crate::services::ServiceError;
use crate::types::TaskStatus;

/// How often an approval is re-planned when the member's score moves underneath it
const MAX_APPROVAL_ATTEMPTS: usize = 3;

/// Members of one household, as listed on the parent dashboard
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HouseholdMembers {
    pub household_id: i32,
    pub members: Vec<MemberRef>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MemberRef {
    pub name: String,
    pub id: i32,
}

/// One member and the tasks currently on their board
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MemberTasks {
    pub member_id: i32,
    pub name: String,
    pub username: String,
    pub total_score: i32,
    pub tasks: Vec<TaskItem>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskItem {
    pub title: String,
    pub id: i32,
    pub points: i32,
    pub status: String,
}

/// Which field a task edit changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMethod {
    Title,
    Points,
}

/// Parent edit of a task; `method` picks which of `title` or `points` is read
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskEdit {
    pub method: Option<EditMethod>,
    pub id: Option<i32>,
    pub title: Option<String>,
    pub points: Option<i32>,
}

/// Body of a parent's approve/reassign decision
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskDecision {
    #[serde(rename = "memberId")]
    pub member_id: Option<i32>,
    pub points: Option<i32>,
    #[serde(rename = "newStatus")]
    pub new_status: Option<String>,
}

/// Member state after an approval
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ApprovalResponse {
    pub level_id: i32,
    pub name: String,
    pub total_score: i32,
    pub badge: String,
    #[serde(rename = "taskId")]
    pub task_id: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TaskDecisionOutcome {
    Approved(ApprovalResponse),
    Reassigned(Task),
}

/// Household, member, task and scoring workflows
#[derive(Clone)]
pub struct HouseholdService {
    repo: Arc<dyn HouseholdRepository>,
    credentials: Arc<dyn CredentialStore>,
    bcrypt_cost: u32,
}

impl HouseholdService {
    pub fn new(
        repo: Arc<dyn HouseholdRepository>,
        credentials: Arc<dyn CredentialStore>,
        bcrypt_cost: u32,
    ) -> Self {
        Self { repo, credentials, bcrypt_cost }
    }

    /// Resolve a household the principal has rights over
    async fn accessible_household(
        &self,
        principal: &Principal,
        household_id: i32,
    ) -> Result<Household, ServiceError> {
        let household = self
            .repo
            .find_household(household_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Household doesn't exist"))?;

        if !principal.can_access(&household) {
            warn!(household_id, kind = ?principal.kind(), "Household access denied");
            return Err(ServiceError::Forbidden);
        }
        Ok(household)
    }

    /// Resolve a household owned by the parent principal
    async fn owned_household(
        &self,
        principal: &Principal,
        household_id: i32,
    ) -> Result<Household, ServiceError> {
        principal.require_parent()?;
        self.accessible_household(principal, household_id).await
    }

    async fn task_in_household(&self, household_id: i32, task_id: i32) -> Result<Task, ServiceError> {
        self.repo
            .find_task(task_id)
            .await?
            .filter(|task| task.household_id == household_id)
            .ok_or_else(|| ServiceError::not_found("Task not found"))
    }

    async fn member_in_household(
        &self,
        household_id: i32,
        member_id: i32,
    ) -> Result<Member, ServiceError> {
        self.repo
            .find_member(member_id)
            .await?
            .filter(|member| member.household_id == household_id)
            .ok_or_else(|| ServiceError::not_found("Member not found"))
    }

    // Households

    pub async fn create_household(
        &self,
        principal: &Principal,
        name: Option<String>,
    ) -> Result<Household, ServiceError> {
        let user = principal.require_parent()?;
        let name = required(name).ok_or(ServiceError::MissingField("name"))?;

        let household = self
            .repo
            .insert_household(NewHousehold { name: escape_html(&name), user_id: user.id })
            .await?;
        info!(household_id = household.id, user_id = user.id, "Household created");
        Ok(household.escaped())
    }

    pub async fn list_households(&self, principal: &Principal) -> Result<Vec<Household>, ServiceError> {
        let user = principal.require_parent()?;
        Ok(self.repo.households_for_user(user.id).await?.escaped())
    }

    /// Rename a household and return the parent's full household list
    pub async fn rename_household(
        &self,
        principal: &Principal,
        household_id: i32,
        name: Option<String>,
    ) -> Result<Vec<Household>, ServiceError> {
        self.owned_household(principal, household_id).await?;
        let name = required(name)
            .ok_or_else(|| ServiceError::validation("Request body must contain household 'name'."))?;

        self.repo.rename_household(household_id, &escape_html(&name)).await?;
        self.list_households(principal).await
    }

    pub async fn delete_household(&self, principal: &Principal, household_id: i32) -> Result<(), ServiceError> {
        self.owned_household(principal, household_id).await?;
        self.repo.delete_household(household_id).await?;
        info!(household_id, "Household deleted");
        Ok(())
    }

    pub async fn account_summary(&self, principal: &Principal) -> Result<Vec<AccountHousehold>, ServiceError> {
        let user = principal.require_parent()?;
        Ok(self.repo.account_summary(user.id).await?.escaped())
    }

    // Members

    /// Every member of every household the parent owns, keyed by household id
    pub async fn members_by_household(
        &self,
        principal: &Principal,
    ) -> Result<BTreeMap<i32, HouseholdMembers>, ServiceError> {
        let user = principal.require_parent()?;
        let members = self.repo.members_for_user(user.id).await?;

        let mut grouped: BTreeMap<i32, HouseholdMembers> = BTreeMap::new();
        for member in members.escaped() {
            grouped
                .entry(member.household_id)
                .or_insert_with(|| HouseholdMembers {
                    household_id: member.household_id,
                    members: Vec::new(),
                })
                .members
                .push(MemberRef { name: member.name, id: member.id });
        }
        Ok(grouped)
    }

    pub async fn list_members(&self, principal: &Principal, household_id: i32) -> Result<Vec<Member>, ServiceError> {
        self.owned_household(principal, household_id).await?;
        Ok(self.repo.members_in_household(household_id).await?.escaped())
    }

    pub async fn add_member(
        &self,
        principal: &Principal,
        household_id: i32,
        name: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Member, ServiceError> {
        let household = self.owned_household(principal, household_id).await?;
        let name = required(name).ok_or(ServiceError::MissingField("name"))?;
        let username = required(username).ok_or(ServiceError::MissingField("username"))?;
        let password = required(password).ok_or(ServiceError::MissingField("password"))?;

        if let Some(message) = validate_member_password(&password) {
            return Err(ServiceError::validation(message));
        }
        if self.credentials.member_exists(&username).await? {
            return Err(ServiceError::validation("Username already taken"));
        }

        let password = hash_password(&password, self.bcrypt_cost).await?;
        let member = self
            .repo
            .insert_member(NewMember {
                name,
                username,
                password,
                household_id,
                user_id: household.user_id,
            })
            .await?;
        info!(member_id = member.id, household_id, "Member added");
        Ok(member.escaped())
    }

    pub async fn update_member(
        &self,
        principal: &Principal,
        household_id: i32,
        member_id: i32,
        mut changes: MemberChanges,
    ) -> Result<Member, ServiceError> {
        self.owned_household(principal, household_id).await?;
        let current = self.member_in_household(household_id, member_id).await?;

        changes.name = required(changes.name);
        changes.username = required(changes.username);
        changes.password = required(changes.password);
        if changes.is_empty() {
            return Err(ServiceError::validation(
                "Request must contain name, username, password, or household",
            ));
        }

        if let Some(username) = &changes.username {
            if *username != current.username && self.credentials.member_exists(username).await? {
                return Err(ServiceError::validation("Username already taken."));
            }
        }
        if let Some(password) = changes.password.take() {
            if let Some(message) = validate_member_password(&password) {
                return Err(ServiceError::validation(message));
            }
            changes.password = Some(hash_password(&password, self.bcrypt_cost).await?);
        }

        let updated = self
            .repo
            .update_member(member_id, changes)
            .await?
            .ok_or_else(|| ServiceError::not_found("Member not found"))?;
        Ok(updated.escaped())
    }

    pub async fn remove_member(
        &self,
        principal: &Principal,
        household_id: i32,
        member_id: Option<i32>,
    ) -> Result<(), ServiceError> {
        self.owned_household(principal, household_id).await?;
        let member_id = member_id.ok_or(ServiceError::MissingField("member_id"))?;
        self.member_in_household(household_id, member_id).await?;

        self.repo.delete_member(member_id).await?;
        info!(member_id, household_id, "Member removed");
        Ok(())
    }

    // Tasks

    pub async fn create_task(
        &self,
        principal: &Principal,
        household_id: i32,
        title: Option<String>,
        member_id: Option<i32>,
        points: Option<i32>,
    ) -> Result<Task, ServiceError> {
        let household = self.owned_household(principal, household_id).await?;

        let (title, member_id, points) = match (required(title), member_id, points) {
            (Some(title), Some(member_id), Some(points)) if points != 0 => (title, member_id, points),
            _ => {
                return Err(ServiceError::validation(
                    "Missing task name, member id or points in request body",
                ))
            }
        };
        if points < 0 {
            return Err(ServiceError::validation("Points must be a positive number"));
        }
        self.member_in_household(household_id, member_id).await?;

        let task = self
            .repo
            .insert_task(NewTask {
                title: escape_html(&title),
                household_id,
                user_id: household.user_id,
                member_id,
                points,
            })
            .await?;
        debug!(task_id = task.id, member_id, points, "Task assigned");
        Ok(task.escaped())
    }

    /// Tasks of a household keyed by member id. Members without tasks are included.
    pub async fn task_board(
        &self,
        principal: &Principal,
        household_id: i32,
    ) -> Result<BTreeMap<i32, MemberTasks>, ServiceError> {
        self.owned_household(principal, household_id).await?;
        let rows = self.repo.task_overview(household_id).await?;

        let mut board: BTreeMap<i32, MemberTasks> = BTreeMap::new();
        for row in rows {
            let entry = board.entry(row.member_id).or_insert_with(|| MemberTasks {
                member_id: row.member_id,
                name: escape_html(&row.name),
                username: escape_html(&row.username),
                total_score: row.total_score,
                tasks: Vec::new(),
            });

            if let (Some(id), Some(title), Some(points), Some(status)) =
                (row.task_id, row.title, row.points, row.status)
            {
                entry.tasks.push(TaskItem { title: escape_html(&title), id, points, status });
            }
        }
        Ok(board)
    }

    pub async fn edit_task(
        &self,
        principal: &Principal,
        household_id: i32,
        edit: TaskEdit,
    ) -> Result<&'static str, ServiceError> {
        self.owned_household(principal, household_id).await?;

        let method = edit
            .method
            .ok_or_else(|| ServiceError::validation("Request body must contain title or points."))?;
        let id = edit.id.ok_or(ServiceError::MissingField("id"))?;

        match method {
            EditMethod::Title => {
                let title = required(edit.title).ok_or(ServiceError::MissingField("title"))?;
                self.task_in_household(household_id, id).await?;
                self.repo.update_task_title(id, &escape_html(&title)).await?;
                Ok("title updated")
            }
            EditMethod::Points => {
                let points = edit.points.ok_or(ServiceError::MissingField("points"))?;
                if points <= 0 {
                    return Err(ServiceError::validation("Points must be a positive number"));
                }
                self.task_in_household(household_id, id).await?;
                self.repo.update_task_points(id, points).await?;
                Ok("points updated")
            }
        }
    }

    pub async fn tasks_with_status(
        &self,
        principal: &Principal,
        household_id: i32,
        status: Option<&str>,
    ) -> Result<Vec<Task>, ServiceError> {
        self.owned_household(principal, household_id).await?;
        let status: TaskStatus = status
            .unwrap_or("completed")
            .parse()
            .map_err(|e: crate::types::UnknownStatus| ServiceError::validation(e.to_string()))?;

        Ok(self.repo.tasks_with_status(household_id, status).await?.escaped())
    }

    /// Remove a task without touching any score
    pub async fn delete_task(
        &self,
        principal: &Principal,
        household_id: i32,
        task_id: i32,
    ) -> Result<(), ServiceError> {
        self.owned_household(principal, household_id).await?;
        self.task_in_household(household_id, task_id).await?;
        self.repo.delete_task(task_id).await?;
        Ok(())
    }

    /// Resolve the member principal addressed by a `/:household_id/members/:member_id` path
    fn own_member<'a>(
        &self,
        principal: &'a Principal,
        household_id: i32,
        member_id: i32,
    ) -> Result<&'a Member, ServiceError> {
        let member = principal.require_member()?;
        if member.household_id != household_id || member.id != member_id {
            warn!(member_id = member.id, household_id, "Member addressed another member's board");
            return Err(ServiceError::Forbidden);
        }
        Ok(member)
    }

    pub async fn member_tasks(
        &self,
        principal: &Principal,
        household_id: i32,
        member_id: i32,
    ) -> Result<Vec<Task>, ServiceError> {
        let member = self.own_member(principal, household_id, member_id)?;
        Ok(self
            .repo
            .assigned_tasks_for_member(member.household_id, member.id)
            .await?
            .escaped())
    }

    /// Member marks one of their assigned tasks completed
    pub async fn complete_task(
        &self,
        principal: &Principal,
        household_id: i32,
        member_id: i32,
        task_id: Option<i32>,
    ) -> Result<(), ServiceError> {
        let member = self.own_member(principal, household_id, member_id)?;
        let task_id = task_id.ok_or(ServiceError::MissingField("taskId"))?;

        if self.repo.complete_task(member.id, member.household_id, task_id).await? {
            debug!(task_id, member_id = member.id, "Task completed");
            return Ok(());
        }

        let task = self
            .repo
            .find_task(task_id)
            .await?
            .filter(|task| task.member_id == member.id && task.household_id == member.household_id)
            .ok_or_else(|| ServiceError::not_found("Task not found"))?;
        let err = scoring::check_transition(task.status, TaskStatus::Completed)
            .err()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Task could not be completed".to_string());
        Err(ServiceError::Conflict(err))
    }

    // Scoring

    /// The member's level, score, badge and points left to the next level
    pub async fn level_progress(&self, principal: &Principal) -> Result<LevelProgress, ServiceError> {
        let member = principal.require_member()?;
        let state = self
            .repo
            .level_state(member.id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Member not found"))?;
        Ok(LevelProgress::from(state.escaped()))
    }

    /// Approve or reassign a completed task.
    ///
    /// Approval plans its writes from a fresh read of the member's level state
    /// and commits them only if the score is still the one it read. A concurrent
    /// approval for the same member forces a re-plan.
    pub async fn decide_task(
        &self,
        principal: &Principal,
        household_id: i32,
        task_id: i32,
        decision: TaskDecision,
    ) -> Result<TaskDecisionOutcome, ServiceError> {
        self.owned_household(principal, household_id).await?;

        let target = match decision.new_status.as_deref() {
            Some("approved") => TaskStatus::Approved,
            Some("assigned") => TaskStatus::Assigned,
            Some(_) | None => {
                return Err(ServiceError::validation(
                    "newStatus must be 'approved' or 'assigned'",
                ))
            }
        };

        for attempt in 1..=MAX_APPROVAL_ATTEMPTS {
            let task = self.task_in_household(household_id, task_id).await?;
            if let Some(member_id) = decision.member_id {
                if member_id != task.member_id {
                    return Err(ServiceError::validation("Task is not assigned to that member"));
                }
            }
            scoring::check_transition(task.status, target)
                .map_err(|e| ServiceError::Conflict(e.to_string()))?;

            if target == TaskStatus::Assigned {
                let (task, write) = scoring::reassign(task);
                match self.repo.apply_writes(None, &[write]).await? {
                    ApplyOutcome::Applied => {
                        info!(task_id, "Task sent back to member");
                        return Ok(TaskDecisionOutcome::Reassigned(task.escaped()));
                    }
                    ApplyOutcome::TaskMissing => return Err(ServiceError::not_found("Task not found")),
                    outcome => {
                        warn!(task_id, attempt, ?outcome, "Task changed during reassign, re-reading");
                        continue;
                    }
                }
            }

            if let Some(points) = decision.points {
                if points != task.points {
                    warn!(task_id, requested = points, stored = task.points, "Ignoring points in approval request");
                }
            }

            let state = self
                .repo
                .level_state(task.member_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("Member not found"))?;
            let plan = scoring::approve(&task, &state)
                .map_err(|e| ServiceError::Conflict(e.to_string()))?;

            match self.repo.apply_writes(Some(plan.expected_score), &plan.writes).await? {
                ApplyOutcome::Applied => {
                    let badge = self
                        .repo
                        .level_state(plan.member_id)
                        .await?
                        .map(|fresh| fresh.badge)
                        .unwrap_or(state.badge);
                    info!(
                        task_id,
                        member_id = plan.member_id,
                        total_score = plan.update.new_score,
                        level = plan.update.new_level,
                        "Task approved"
                    );
                    return Ok(TaskDecisionOutcome::Approved(ApprovalResponse {
                        level_id: plan.update.new_level,
                        name: escape_html(&state.name),
                        total_score: plan.update.new_score,
                        badge,
                        task_id,
                    }));
                }
                ApplyOutcome::Stale => {
                    warn!(task_id, attempt, "Score changed during approval, re-planning");
                }
                ApplyOutcome::StatusChanged => {
                    warn!(task_id, attempt, "Task status changed during approval, re-planning");
                }
                ApplyOutcome::TaskMissing => return Err(ServiceError::not_found("Task not found")),
            }
        }

        Err(ServiceError::Conflict(
            "Task or score changed while deciding; try again".to_string(),
        ))
    }

    /// Leaderboard of the member's own household
    pub async fn household_scores(&self, principal: &Principal) -> Result<Vec<ScoreEntry>, ServiceError> {
        let member = principal.require_member()?;
        Ok(self.repo.household_scores(member.household_id).await?.escaped())
    }

    /// Zero every score and level in a household and return the new leaderboard
    pub async fn reset_household(
        &self,
        principal: &Principal,
        household_id: Option<i32>,
    ) -> Result<Vec<ScoreEntry>, ServiceError> {
        let household_id = household_id.ok_or(ServiceError::MissingField("household_id"))?;
        self.owned_household(principal, household_id).await?;

        let scores = self.repo.reset_scores(household_id).await?;
        let levels = self.repo.reset_levels(household_id).await?;
        info!(household_id, scores, levels, "Household scores reset");

        Ok(self.repo.household_scores(household_id).await?.escaped())
    }
}

/// Treat empty strings the way absent fields are treated
fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
