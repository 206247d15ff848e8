//! In-memory repository and seed data for unit and integration tests

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::auth::{hash_password, Principal};
use crate::database::models::{
    AccountHousehold, Household, LevelState, Member, MemberChanges, NewHousehold, NewMember,
    NewTask, NewUser, ScoreEntry, Task, TaskOverview, User,
};
use crate::database::{ApplyOutcome, CredentialStore, DatabaseError, HouseholdRepository};
use crate::scoring::{ScoreWrite, BASE_LEVEL};
use crate::types::TaskStatus;

/// Password shared by the seeded parent accounts
pub const PARENT_PASSWORD: &str = "11AAaa!!";

#[derive(Debug, Clone, Default)]
struct State {
    users: BTreeMap<i32, User>,
    households: BTreeMap<i32, Household>,
    members: BTreeMap<i32, Member>,
    tasks: BTreeMap<i32, Task>,
    /// member id -> level id
    levels: BTreeMap<i32, i32>,
    next_id: i32,
    /// Applied to a member's score right before the next conditional batch
    pending_bump: Option<(i32, i32)>,
    /// Applied to a task right before the next batch of any kind
    pending_status: Option<(i32, TaskStatus)>,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn apply(&mut self, expected_score: Option<i32>, write: &ScoreWrite) -> Option<ApplyOutcome> {
        match write {
            ScoreWrite::DeleteTask { task_id, expected } => match self.tasks.get(task_id).map(|t| t.status) {
                Some(status) if status == *expected => {
                    self.tasks.remove(task_id);
                    None
                }
                Some(_) => Some(ApplyOutcome::StatusChanged),
                None => Some(ApplyOutcome::TaskMissing),
            },
            ScoreWrite::SetTaskStatus { task_id, expected, status } => match self.tasks.get_mut(task_id) {
                Some(task) if task.status == *expected => {
                    task.status = *status;
                    None
                }
                Some(_) => Some(ApplyOutcome::StatusChanged),
                None => Some(ApplyOutcome::TaskMissing),
            },
            ScoreWrite::UpdateLevel { member_id, level } => match self.levels.get_mut(member_id) {
                Some(current) => {
                    *current = *level;
                    None
                }
                None => Some(ApplyOutcome::Stale),
            },
            ScoreWrite::UpdatePoints { member_id, score } => match self.members.get_mut(member_id) {
                Some(member) if expected_score.map_or(true, |e| e == member.total_score) => {
                    member.total_score = *score;
                    None
                }
                _ => Some(ApplyOutcome::Stale),
            },
        }
    }
}

/// Credential store and household repository held in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` to a member's score just before the next conditional
    /// write batch, as a concurrent approval would
    pub async fn bump_score_before_next_apply(&self, member_id: i32, delta: i32) {
        self.state.write().await.pending_bump = Some((member_id, delta));
    }

    /// Move a task to `status` just before the next write batch, as a
    /// concurrent decision or completion would
    pub async fn set_task_status_before_next_apply(&self, task_id: i32, status: TaskStatus) {
        self.state.write().await.pending_status = Some((task_id, status));
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn user_exists(&self, username: &str) -> Result<bool, DatabaseError> {
        Ok(self.find_user_by_username(username).await?.is_some())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.username == user.username) {
            return Err(DatabaseError::QueryError(format!(
                "duplicate username '{}'",
                user.username
            )));
        }
        let id = state.next_id();
        let user = User {
            id,
            username: user.username,
            password: user.password,
            name: user.name,
            created_at: Utc::now(),
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_member_by_username(&self, username: &str) -> Result<Option<Member>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.members.values().find(|m| m.username == username).cloned())
    }

    async fn member_exists(&self, username: &str) -> Result<bool, DatabaseError> {
        Ok(self.find_member_by_username(username).await?.is_some())
    }
}

#[async_trait]
impl HouseholdRepository for MemoryStore {
    async fn insert_household(&self, household: NewHousehold) -> Result<Household, DatabaseError> {
        let mut state = self.state.write().await;
        let id = state.next_id();
        let household = Household { id, name: household.name, user_id: household.user_id };
        state.households.insert(id, household.clone());
        Ok(household)
    }

    async fn households_for_user(&self, user_id: i32) -> Result<Vec<Household>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.households.values().filter(|h| h.user_id == user_id).cloned().collect())
    }

    async fn find_household(&self, household_id: i32) -> Result<Option<Household>, DatabaseError> {
        Ok(self.state.read().await.households.get(&household_id).cloned())
    }

    async fn rename_household(&self, household_id: i32, name: &str) -> Result<(), DatabaseError> {
        let mut state = self.state.write().await;
        if let Some(household) = state.households.get_mut(&household_id) {
            household.name = name.to_string();
        }
        Ok(())
    }

    async fn delete_household(&self, household_id: i32) -> Result<(), DatabaseError> {
        let mut state = self.state.write().await;
        state.households.remove(&household_id);
        state.tasks.retain(|_, t| t.household_id != household_id);
        let removed: Vec<i32> = state
            .members
            .values()
            .filter(|m| m.household_id == household_id)
            .map(|m| m.id)
            .collect();
        for member_id in removed {
            state.members.remove(&member_id);
            state.levels.remove(&member_id);
        }
        Ok(())
    }

    async fn account_summary(&self, user_id: i32) -> Result<Vec<AccountHousehold>, DatabaseError> {
        let state = self.state.read().await;
        let Some(user) = state.users.get(&user_id) else {
            return Ok(Vec::new());
        };
        Ok(state
            .households
            .values()
            .filter(|h| h.user_id == user_id)
            .map(|h| AccountHousehold {
                user: user.name.clone(),
                household_id: h.id,
                housename: h.name.clone(),
            })
            .collect())
    }

    async fn members_for_user(&self, user_id: i32) -> Result<Vec<Member>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.members.values().filter(|m| m.user_id == user_id).cloned().collect())
    }

    async fn members_in_household(&self, household_id: i32) -> Result<Vec<Member>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.members.values().filter(|m| m.household_id == household_id).cloned().collect())
    }

    async fn find_member(&self, member_id: i32) -> Result<Option<Member>, DatabaseError> {
        Ok(self.state.read().await.members.get(&member_id).cloned())
    }

    async fn insert_member(&self, member: NewMember) -> Result<Member, DatabaseError> {
        let mut state = self.state.write().await;
        if state.members.values().any(|m| m.username == member.username) {
            return Err(DatabaseError::QueryError(format!(
                "duplicate member username '{}'",
                member.username
            )));
        }
        let id = state.next_id();
        let member = Member {
            id,
            name: member.name,
            username: member.username,
            password: member.password,
            household_id: member.household_id,
            user_id: member.user_id,
            total_score: 0,
        };
        state.members.insert(id, member.clone());
        state.levels.insert(id, BASE_LEVEL);
        Ok(member)
    }

    async fn update_member(
        &self,
        member_id: i32,
        changes: MemberChanges,
    ) -> Result<Option<Member>, DatabaseError> {
        let mut state = self.state.write().await;
        let Some(member) = state.members.get_mut(&member_id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            member.name = name;
        }
        if let Some(username) = changes.username {
            member.username = username;
        }
        if let Some(password) = changes.password {
            member.password = password;
        }
        Ok(Some(member.clone()))
    }

    async fn delete_member(&self, member_id: i32) -> Result<bool, DatabaseError> {
        let mut state = self.state.write().await;
        state.tasks.retain(|_, t| t.member_id != member_id);
        state.levels.remove(&member_id);
        Ok(state.members.remove(&member_id).is_some())
    }

    async fn insert_task(&self, task: NewTask) -> Result<Task, DatabaseError> {
        let mut state = self.state.write().await;
        let id = state.next_id();
        let task = Task {
            id,
            title: task.title,
            household_id: task.household_id,
            user_id: task.user_id,
            member_id: task.member_id,
            points: task.points,
            status: TaskStatus::Assigned,
        };
        state.tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, task_id: i32) -> Result<Option<Task>, DatabaseError> {
        Ok(self.state.read().await.tasks.get(&task_id).cloned())
    }

    async fn task_overview(&self, household_id: i32) -> Result<Vec<TaskOverview>, DatabaseError> {
        let state = self.state.read().await;
        let mut rows = Vec::new();
        for member in state.members.values().filter(|m| m.household_id == household_id) {
            let row = |task: Option<&Task>| TaskOverview {
                member_id: member.id,
                name: member.name.clone(),
                username: member.username.clone(),
                total_score: member.total_score,
                task_id: task.map(|t| t.id),
                title: task.map(|t| t.title.clone()),
                points: task.map(|t| t.points),
                status: task.map(|t| t.status.to_string()),
            };
            let tasks: Vec<&Task> = state.tasks.values().filter(|t| t.member_id == member.id).collect();
            if tasks.is_empty() {
                rows.push(row(None));
            } else {
                rows.extend(tasks.into_iter().map(|t| row(Some(t))));
            }
        }
        Ok(rows)
    }

    async fn tasks_with_status(
        &self,
        household_id: i32,
        status: TaskStatus,
    ) -> Result<Vec<Task>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .values()
            .filter(|t| t.household_id == household_id && t.status == status)
            .cloned()
            .collect())
    }

    async fn assigned_tasks_for_member(
        &self,
        household_id: i32,
        member_id: i32,
    ) -> Result<Vec<Task>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .values()
            .filter(|t| {
                t.household_id == household_id
                    && t.member_id == member_id
                    && t.status == TaskStatus::Assigned
            })
            .cloned()
            .collect())
    }

    async fn update_task_points(&self, task_id: i32, points: i32) -> Result<bool, DatabaseError> {
        let mut state = self.state.write().await;
        Ok(state.tasks.get_mut(&task_id).map(|t| t.points = points).is_some())
    }

    async fn update_task_title(&self, task_id: i32, title: &str) -> Result<bool, DatabaseError> {
        let mut state = self.state.write().await;
        Ok(state.tasks.get_mut(&task_id).map(|t| t.title = title.to_string()).is_some())
    }

    async fn complete_task(
        &self,
        member_id: i32,
        household_id: i32,
        task_id: i32,
    ) -> Result<bool, DatabaseError> {
        let mut state = self.state.write().await;
        match state.tasks.get_mut(&task_id) {
            Some(task)
                if task.member_id == member_id
                    && task.household_id == household_id
                    && task.status == TaskStatus::Assigned =>
            {
                task.status = TaskStatus::Completed;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_task(&self, task_id: i32) -> Result<bool, DatabaseError> {
        Ok(self.state.write().await.tasks.remove(&task_id).is_some())
    }

    async fn level_state(&self, member_id: i32) -> Result<Option<LevelState>, DatabaseError> {
        let state = self.state.read().await;
        let (Some(member), Some(level)) = (state.members.get(&member_id), state.levels.get(&member_id))
        else {
            return Ok(None);
        };
        Ok(Some(LevelState {
            level_id: *level,
            name: member.name.clone(),
            total_score: member.total_score,
            badge: format!("Badge{level}"),
        }))
    }

    async fn apply_writes(
        &self,
        expected_score: Option<i32>,
        writes: &[ScoreWrite],
    ) -> Result<ApplyOutcome, DatabaseError> {
        let mut state = self.state.write().await;
        if let Some((task_id, status)) = state.pending_status.take() {
            if let Some(task) = state.tasks.get_mut(&task_id) {
                task.status = status;
            }
        }
        if expected_score.is_some() {
            if let Some((member_id, delta)) = state.pending_bump.take() {
                if let Some(member) = state.members.get_mut(&member_id) {
                    member.total_score += delta;
                }
            }
        }

        let mut draft = state.clone();
        for write in writes {
            if let Some(outcome) = draft.apply(expected_score, write) {
                return Ok(outcome);
            }
        }
        *state = draft;
        Ok(ApplyOutcome::Applied)
    }

    async fn household_scores(&self, household_id: i32) -> Result<Vec<ScoreEntry>, DatabaseError> {
        let state = self.state.read().await;
        let mut scores: Vec<ScoreEntry> = state
            .members
            .values()
            .filter(|m| m.household_id == household_id)
            .map(|m| ScoreEntry { id: m.id, name: m.name.clone(), total_score: m.total_score })
            .collect();
        scores.sort_by(|a, b| b.total_score.cmp(&a.total_score).then(a.id.cmp(&b.id)));
        Ok(scores)
    }

    async fn reset_scores(&self, household_id: i32) -> Result<u64, DatabaseError> {
        let mut state = self.state.write().await;
        let mut count = 0;
        for member in state.members.values_mut().filter(|m| m.household_id == household_id) {
            member.total_score = 0;
            count += 1;
        }
        Ok(count)
    }

    async fn reset_levels(&self, household_id: i32) -> Result<u64, DatabaseError> {
        let mut state = self.state.write().await;
        let ids: Vec<i32> = state
            .members
            .values()
            .filter(|m| m.household_id == household_id)
            .map(|m| m.id)
            .collect();
        let mut count = 0;
        for id in ids {
            if let Some(level) = state.levels.get_mut(&id) {
                *level = BASE_LEVEL;
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Seeded accounts, households, members and tasks.
///
/// `parent` owns `household` (kid_one, kid_two) and `second_household`
/// (kid_three). `other_parent` owns `third_household` (kid_four).
/// Member passwords equal their usernames.
#[derive(Debug, Clone)]
pub struct Fixtures {
    pub parent: User,
    pub other_parent: User,
    pub household: Household,
    pub second_household: Household,
    pub third_household: Household,
    pub kid_one: Member,
    pub kid_two: Member,
    pub kid_three: Member,
    pub kid_four: Member,
    pub tasks: Vec<Task>,
}

impl Fixtures {
    pub fn parent_principal(&self) -> Principal {
        Principal::Parent(self.parent.clone())
    }

    pub fn other_parent_principal(&self) -> Principal {
        Principal::Parent(self.other_parent.clone())
    }

    pub fn member_principal(&self, member: &Member) -> Principal {
        Principal::Member(member.clone())
    }

    fn task_for(&self, member_id: i32, status: TaskStatus) -> Task {
        self.tasks
            .iter()
            .find(|t| t.member_id == member_id && t.status == status)
            .cloned()
            .unwrap_or_else(|| panic!("no {status} fixture task for member {member_id}"))
    }

    pub fn assigned_task_for(&self, member_id: i32) -> Task {
        self.task_for(member_id, TaskStatus::Assigned)
    }

    pub fn completed_task_for(&self, member_id: i32) -> Task {
        self.task_for(member_id, TaskStatus::Completed)
    }
}

async fn seed_member<R>(
    repo: &R,
    household: &Household,
    username: &str,
    score: i32,
    cost: u32,
) -> anyhow::Result<Member>
where
    R: HouseholdRepository + ?Sized,
{
    let mut member = repo
        .insert_member(NewMember {
            name: format!("Kid {}", &username[3..]),
            username: username.to_string(),
            password: hash_password(username, cost).await?,
            household_id: household.id,
            user_id: household.user_id,
        })
        .await?;

    let level = score / 10 + 1;
    repo.apply_writes(
        None,
        &[
            ScoreWrite::UpdateLevel { member_id: member.id, level },
            ScoreWrite::UpdatePoints { member_id: member.id, score },
        ],
    )
    .await?;
    member.total_score = score;
    Ok(member)
}

async fn seed_task<R>(
    repo: &R,
    member: &Member,
    title: &str,
    points: i32,
    completed: bool,
) -> anyhow::Result<Task>
where
    R: HouseholdRepository + ?Sized,
{
    let mut task = repo
        .insert_task(NewTask {
            title: title.to_string(),
            household_id: member.household_id,
            user_id: member.user_id,
            member_id: member.id,
            points,
        })
        .await?;
    if completed {
        repo.complete_task(member.id, member.household_id, task.id).await?;
        task.status = TaskStatus::Completed;
    }
    Ok(task)
}

/// Populate any store with the standard fixture set
pub async fn seed_fixtures<S>(store: &S, cost: u32) -> anyhow::Result<Fixtures>
where
    S: CredentialStore + HouseholdRepository + ?Sized,
{
    let password = hash_password(PARENT_PASSWORD, cost).await?;
    let parent = store
        .insert_user(NewUser {
            username: "dunder".to_string(),
            password: password.clone(),
            name: "Dunder Mifflin".to_string(),
        })
        .await?;
    let other_parent = store
        .insert_user(NewUser {
            username: "bobloblaw".to_string(),
            password,
            name: "Bob Loblaw".to_string(),
        })
        .await?;

    let household = store
        .insert_household(NewHousehold { name: "Scranton".to_string(), user_id: parent.id })
        .await?;
    let second_household = store
        .insert_household(NewHousehold { name: "Stamford".to_string(), user_id: parent.id })
        .await?;
    let third_household = store
        .insert_household(NewHousehold { name: "Law Blog".to_string(), user_id: other_parent.id })
        .await?;

    let kid_one = seed_member(store, &household, "kid1", 20, cost).await?;
    let kid_two = seed_member(store, &household, "kid2", 5, cost).await?;
    let kid_three = seed_member(store, &second_household, "kid3", 30, cost).await?;
    let kid_four = seed_member(store, &third_household, "kid4", 0, cost).await?;

    let tasks = vec![
        seed_task(store, &kid_one, "Take out trash", 5, false).await?,
        seed_task(store, &kid_one, "Wash dishes", 10, true).await?,
        seed_task(store, &kid_two, "Walk the dog", 5, true).await?,
        seed_task(store, &kid_four, "Feed the cat", 3, true).await?,
    ];

    Ok(Fixtures {
        parent,
        other_parent,
        household,
        second_household,
        third_household,
        kid_one,
        kid_two,
        kid_three,
        kid_four,
        tasks,
    })
}
