//! Leveling and scoring rules for task approval.
//!
//! Everything here is pure: callers load the member's current state, ask the
//! engine what the new state is and which writes follow, then persist them.

use serde::Serialize;
use thiserror::Error;

use crate::database::models::{LevelState, Task};
use crate::types::TaskStatus;

/// Points needed per level; level `L` is complete once the score reaches `L * 10`
pub const POINTS_PER_LEVEL: i32 = 10;

/// Highest level a member can hold. Score keeps accumulating past it.
pub const LEVEL_CAP: i32 = 10;

/// Level every member starts at, and returns to on a household reset
pub const BASE_LEVEL: i32 = 1;

/// Result of applying an approval to a member's score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreUpdate {
    pub new_score: i32,
    pub new_level: i32,
    pub level_changed: bool,
}

/// The approved points do not fit in the member's score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("score {current_score} cannot take {awarded_points} more points")]
pub struct ScoreOverflow {
    pub current_score: i32,
    pub awarded_points: i32,
}

/// Compute the new score and level after `awarded_points` are approved.
///
/// The member advances at most one level per approval. A member who would
/// advance past [`LEVEL_CAP`] keeps their current level but still banks the
/// points.
pub fn apply_approval(
    current_score: i32,
    current_level: i32,
    awarded_points: i32,
) -> Result<ScoreUpdate, ScoreOverflow> {
    let new_score = current_score.checked_add(awarded_points).ok_or(ScoreOverflow {
        current_score,
        awarded_points,
    })?;

    let candidate_level = if new_score >= current_level.saturating_mul(POINTS_PER_LEVEL) {
        current_level + 1
    } else {
        current_level
    };

    let new_level = if candidate_level > LEVEL_CAP {
        current_level
    } else {
        candidate_level
    };

    Ok(ScoreUpdate {
        new_score,
        new_level,
        level_changed: new_level != current_level,
    })
}

/// Distance to the next level. Not clamped: once a member sits at the cap the
/// score keeps growing and this goes negative.
pub fn next_level_gap(level: i32, total_score: i32) -> i32 {
    level * POINTS_PER_LEVEL - total_score
}

/// A persistence call the engine asks the caller to make
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreWrite {
    /// Only lands while the task is still in `expected`
    DeleteTask { task_id: i32, expected: TaskStatus },
    UpdateLevel { member_id: i32, level: i32 },
    UpdatePoints { member_id: i32, score: i32 },
    SetTaskStatus { task_id: i32, expected: TaskStatus, status: TaskStatus },
}

/// Everything needed to persist one approval, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalPlan {
    pub task_id: i32,
    pub member_id: i32,
    /// Score the update was computed from; the points write must not land on any other
    pub expected_score: i32,
    pub update: ScoreUpdate,
    pub writes: Vec<ScoreWrite>,
}

/// Plan the approval of `task` for a member currently at `current`.
///
/// The approved task is deleted first; its value lives on only in the score.
/// The level write is skipped when the level does not move.
pub fn approve(task: &Task, current: &LevelState) -> Result<ApprovalPlan, ScoreOverflow> {
    let update = apply_approval(current.total_score, current.level_id, task.points)?;

    let mut writes = vec![ScoreWrite::DeleteTask {
        task_id: task.id,
        expected: task.status,
    }];
    if update.level_changed {
        writes.push(ScoreWrite::UpdateLevel {
            member_id: task.member_id,
            level: update.new_level,
        });
    }
    writes.push(ScoreWrite::UpdatePoints {
        member_id: task.member_id,
        score: update.new_score,
    });

    Ok(ApprovalPlan {
        task_id: task.id,
        member_id: task.member_id,
        expected_score: current.total_score,
        update,
        writes,
    })
}

/// Send a task back for rework. Score and level are untouched.
pub fn reassign(task: Task) -> (Task, ScoreWrite) {
    let write = ScoreWrite::SetTaskStatus {
        task_id: task.id,
        expected: task.status,
        status: TaskStatus::Assigned,
    };
    (
        Task {
            status: TaskStatus::Assigned,
            ..task
        },
        write,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("task cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub from: TaskStatus,
    pub to: TaskStatus,
}

/// Task lifecycle: assigned -> completed -> approved | assigned
pub fn check_transition(from: TaskStatus, to: TaskStatus) -> Result<(), InvalidTransition> {
    match (from, to) {
        (TaskStatus::Assigned, TaskStatus::Completed)
        | (TaskStatus::Completed, TaskStatus::Approved)
        | (TaskStatus::Completed, TaskStatus::Assigned) => Ok(()),
        _ => Err(InvalidTransition { from, to }),
    }
}

/// Level state as shown to a member, with the distance to the next level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelProgress {
    pub level_id: i32,
    pub name: String,
    pub total_score: i32,
    pub badge: String,
    #[serde(rename = "nextLevel")]
    pub next_level: i32,
}

impl From<LevelState> for LevelProgress {
    fn from(state: LevelState) -> Self {
        Self {
            next_level: next_level_gap(state.level_id, state.total_score),
            level_id: state.level_id,
            name: state.name,
            total_score: state.total_score,
            badge: state.badge,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(points: i32) -> Task {
        Task {
            id: 7,
            title: "dishes".to_string(),
            household_id: 1,
            user_id: 1,
            member_id: 3,
            points,
            status: TaskStatus::Completed,
        }
    }

    fn state(total_score: i32, level_id: i32) -> LevelState {
        LevelState {
            level_id,
            name: "kid".to_string(),
            total_score,
            badge: format!("Badge{}", level_id),
        }
    }

    #[test]
    fn advances_exactly_one_level_below_cap() {
        for level in 1..LEVEL_CAP {
            for score in 0..(level * POINTS_PER_LEVEL) {
                let needed = level * POINTS_PER_LEVEL - score;
                for extra in 0..25 {
                    let update = apply_approval(score, level, needed + extra).unwrap();
                    assert_eq!(update.new_level, level + 1, "level {level} score {score}");
                    assert!(update.level_changed);
                }
            }
        }
    }

    #[test]
    fn stays_put_when_threshold_not_reached() {
        let update = apply_approval(12, 2, 3).unwrap();
        assert_eq!(update, ScoreUpdate { new_score: 15, new_level: 2, level_changed: false });
    }

    #[test]
    fn never_advances_past_cap() {
        for score in [0, 99, 100, 150, 10_000] {
            for points in [1, 5, 20, 500] {
                let update = apply_approval(score, LEVEL_CAP, points).unwrap();
                assert_eq!(update.new_level, LEVEL_CAP);
                assert!(!update.level_changed);
            }
        }
    }

    #[test]
    fn score_is_always_sum() {
        for score in [0, 3, 19, 250] {
            for level in 1..=LEVEL_CAP {
                for points in 1..15 {
                    assert_eq!(apply_approval(score, level, points).unwrap().new_score, score + points);
                }
            }
        }
    }

    #[test]
    fn scenario_level_two_to_three() {
        let update = apply_approval(25, 2, 5).unwrap();
        assert_eq!(update, ScoreUpdate { new_score: 30, new_level: 3, level_changed: true });
    }

    #[test]
    fn scenario_reaches_cap() {
        let update = apply_approval(95, 9, 10).unwrap();
        assert_eq!(update, ScoreUpdate { new_score: 105, new_level: 10, level_changed: true });
    }

    #[test]
    fn scenario_capped_member_keeps_scoring() {
        let update = apply_approval(100, 10, 20).unwrap();
        assert_eq!(update, ScoreUpdate { new_score: 120, new_level: 10, level_changed: false });
    }

    #[test]
    fn overflowing_score_is_refused() {
        let err = apply_approval(i32::MAX - 2, LEVEL_CAP, 5).unwrap_err();
        assert_eq!(err, ScoreOverflow { current_score: i32::MAX - 2, awarded_points: 5 });
        assert!(approve(&task(5), &state(i32::MAX, LEVEL_CAP)).is_err());
        assert_eq!(apply_approval(i32::MAX - 5, LEVEL_CAP, 5).unwrap().new_score, i32::MAX);
    }

    #[test]
    fn approve_orders_writes_delete_level_points() {
        let plan = approve(&task(5), &state(25, 2)).unwrap();
        assert_eq!(plan.expected_score, 25);
        assert_eq!(
            plan.writes,
            vec![
                ScoreWrite::DeleteTask { task_id: 7, expected: TaskStatus::Completed },
                ScoreWrite::UpdateLevel { member_id: 3, level: 3 },
                ScoreWrite::UpdatePoints { member_id: 3, score: 30 },
            ]
        );
    }

    #[test]
    fn approve_skips_level_write_when_capped() {
        let plan = approve(&task(20), &state(100, 10)).unwrap();
        assert_eq!(
            plan.writes,
            vec![
                ScoreWrite::DeleteTask { task_id: 7, expected: TaskStatus::Completed },
                ScoreWrite::UpdatePoints { member_id: 3, score: 120 },
            ]
        );
    }

    #[test]
    fn reassign_only_touches_status() {
        let (task, write) = reassign(task(4));
        assert_eq!(task.status, TaskStatus::Assigned);
        assert_eq!(task.points, 4);
        assert_eq!(
            write,
            ScoreWrite::SetTaskStatus {
                task_id: 7,
                expected: TaskStatus::Completed,
                status: TaskStatus::Assigned,
            }
        );
    }

    #[test]
    fn transitions_follow_lifecycle() {
        use TaskStatus::*;
        assert!(check_transition(Assigned, Completed).is_ok());
        assert!(check_transition(Completed, Approved).is_ok());
        assert!(check_transition(Completed, Assigned).is_ok());
        assert!(check_transition(Assigned, Approved).is_err());
        assert!(check_transition(Approved, Assigned).is_err());
        assert!(check_transition(Assigned, Assigned).is_err());
    }

    #[test]
    fn gap_goes_negative_past_cap() {
        assert_eq!(next_level_gap(2, 15), 5);
        assert_eq!(next_level_gap(10, 120), -20);

        let progress = LevelProgress::from(state(120, 10));
        assert_eq!(progress.next_level, -20);
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["nextLevel"], -20);
    }
}
