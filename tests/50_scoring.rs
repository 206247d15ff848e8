mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use chorerunner_api::database::HouseholdRepository;
use common::{read, TestApp};

fn decision_path(app: &TestApp, task_id: i32) -> String {
    format!("/api/households/{}/tasks/status/{}", app.fixtures.household.id, task_id)
}

#[tokio::test]
async fn approval_awards_points_and_levels_up() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.parent_token().await?;
    let fx = &app.fixtures;
    let task = fx.completed_task_for(fx.kid_one.id);

    let (status, body) = read(
        app.patch(
            &decision_path(&app, task.id),
            &token,
            json!({ "memberId": fx.kid_one.id, "points": task.points, "newStatus": "approved" }),
        )
        .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_score"], 30);
    assert_eq!(body["data"]["level_id"], 4);
    assert_eq!(body["data"]["badge"], "Badge4");
    assert_eq!(body["data"]["name"], "Kid 1");
    assert_eq!(body["data"]["taskId"], task.id);

    assert!(app.store.find_task(task.id).await?.is_none());

    let member = app.member_token("kid1").await?;
    let (_, body) = read(app.get("/api/members", &member).await?).await?;
    assert_eq!(body["data"]["level_id"], 4);
    assert_eq!(body["data"]["total_score"], 30);
    assert_eq!(body["data"]["nextLevel"], 10);
    Ok(())
}

#[tokio::test]
async fn approval_reaching_threshold_levels_up() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.parent_token().await?;
    let fx = &app.fixtures;
    let task = fx.completed_task_for(fx.kid_two.id);

    let (status, body) = read(
        app.patch(&decision_path(&app, task.id), &token, json!({ "newStatus": "approved" }))
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    // kid2 holds 5 points at level 1; a 5 point task reaches the level 1 threshold
    assert_eq!(body["data"]["total_score"], 10);
    assert_eq!(body["data"]["level_id"], 2);
    Ok(())
}

#[tokio::test]
async fn approval_below_threshold_keeps_level() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.parent_token().await?;
    let fx = &app.fixtures;

    let (_, body) = read(
        app.post(
            &format!("/api/households/{}/tasks", fx.household.id),
            &token,
            json!({ "title": "Water plants", "member_id": fx.kid_one.id, "points": 3 }),
        )
        .await?,
    )
    .await?;
    let task_id = body["data"]["id"].as_i64().unwrap() as i32;
    app.store.complete_task(fx.kid_one.id, fx.household.id, task_id).await?;

    let (status, body) = read(
        app.patch(&decision_path(&app, task_id), &token, json!({ "newStatus": "approved" }))
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    // 20 + 3 stays short of the level 3 threshold of 30
    assert_eq!(body["data"]["total_score"], 23);
    assert_eq!(body["data"]["level_id"], 3);
    assert_eq!(body["data"]["badge"], "Badge3");
    Ok(())
}

#[tokio::test]
async fn approval_uses_stored_points() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.parent_token().await?;
    let fx = &app.fixtures;
    let task = fx.completed_task_for(fx.kid_one.id);

    let (status, body) = read(
        app.patch(
            &decision_path(&app, task.id),
            &token,
            json!({ "memberId": fx.kid_one.id, "points": 500, "newStatus": "approved" }),
        )
        .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_score"], 20 + task.points);
    Ok(())
}

#[tokio::test]
async fn second_approval_of_same_task_is_404() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.parent_token().await?;
    let task = app.fixtures.completed_task_for(app.fixtures.kid_one.id);
    let path = decision_path(&app, task.id);

    let res = app.patch(&path, &token, json!({ "newStatus": "approved" })).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let (status, body) = read(app.patch(&path, &token, json!({ "newStatus": "approved" })).await?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Task not found");
    Ok(())
}

#[tokio::test]
async fn concurrent_approvals_for_one_member_both_count() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.parent_token().await?;
    let fx = &app.fixtures;

    // Give kid2 a second completed task, then approve both at once
    let (_, body) = read(
        app.post(
            &format!("/api/households/{}/tasks", fx.household.id),
            &token,
            json!({ "title": "Rake leaves", "member_id": fx.kid_two.id, "points": 7 }),
        )
        .await?,
    )
    .await?;
    let extra = body["data"]["id"].as_i64().unwrap() as i32;
    app.store.complete_task(fx.kid_two.id, fx.household.id, extra).await?;
    let first = fx.completed_task_for(fx.kid_two.id);

    let first_path = decision_path(&app, first.id);
    let extra_path = decision_path(&app, extra);
    let (a, b) = tokio::join!(
        app.patch(&first_path, &token, json!({ "newStatus": "approved" })),
        app.patch(&extra_path, &token, json!({ "newStatus": "approved" })),
    );
    assert_eq!(a?.status(), StatusCode::OK);
    assert_eq!(b?.status(), StatusCode::OK);

    let member = app.member_token("kid2").await?;
    let (_, body) = read(app.get("/api/members", &member).await?).await?;
    assert_eq!(body["data"]["total_score"], 5 + 5 + 7);
    Ok(())
}

#[tokio::test]
async fn reassign_sends_task_back() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.parent_token().await?;
    let fx = &app.fixtures;
    let task = fx.completed_task_for(fx.kid_one.id);

    let (status, body) = read(
        app.patch(&decision_path(&app, task.id), &token, json!({ "newStatus": "assigned" }))
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], task.id);
    assert_eq!(body["data"]["status"], "assigned");

    let member = app.member_token("kid1").await?;
    let (_, body) = read(app.get("/api/members", &member).await?).await?;
    assert_eq!(body["data"]["total_score"], 20);

    let path = format!("/api/households/{}/members/{}/tasks", fx.household.id, fx.kid_one.id);
    let (_, body) = read(app.get(&path, &member).await?).await?;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    Ok(())
}

#[tokio::test]
async fn only_completed_tasks_can_be_decided() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.parent_token().await?;
    let task = app.fixtures.assigned_task_for(app.fixtures.kid_one.id);

    let (status, _) = read(
        app.patch(&decision_path(&app, task.id), &token, json!({ "newStatus": "approved" }))
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = read(
        app.patch(&decision_path(&app, task.id), &token, json!({ "newStatus": "done" }))
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "newStatus must be 'approved' or 'assigned'");
    Ok(())
}

#[tokio::test]
async fn members_cannot_approve() -> Result<()> {
    let app = TestApp::spawn().await?;
    let member = app.member_token("kid1").await?;
    let task = app.fixtures.completed_task_for(app.fixtures.kid_one.id);

    let (status, body) = read(
        app.patch(&decision_path(&app, task.id), &member, json!({ "newStatus": "approved" }))
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Unauthorized request");
    Ok(())
}

#[tokio::test]
async fn level_state_via_task_status_route() -> Result<()> {
    let app = TestApp::spawn().await?;
    let member = app.member_token("kid3").await?;
    let task = app.fixtures.completed_task_for(app.fixtures.kid_one.id);

    let (status, body) = read(app.get(&decision_path(&app, task.id), &member).await?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["level_id"], 4);
    assert_eq!(body["data"]["total_score"], 30);
    assert_eq!(body["data"]["nextLevel"], 10);

    let parent = app.parent_token().await?;
    let (status, _) = read(app.get(&decision_path(&app, task.id), &parent).await?).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn leaderboard_is_ordered_by_score() -> Result<()> {
    let app = TestApp::spawn().await?;
    let member = app.member_token("kid2").await?;

    let (status, body) = read(app.get("/api/households/household/scores", &member).await?).await?;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], "Kid 1");
    assert_eq!(rows[0]["total_score"], 20);
    assert_eq!(rows[1]["total_score"], 5);
    Ok(())
}

#[tokio::test]
async fn reset_zeroes_scores_and_levels() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.parent_token().await?;
    let fx = &app.fixtures;

    let (status, body) = read(
        app.patch("/api/households/household/scores", &token, json!({ "household_id": fx.household.id }))
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().iter().all(|r| r["total_score"] == 0));

    let member = app.member_token("kid1").await?;
    let (_, body) = read(app.get("/api/members", &member).await?).await?;
    assert_eq!(body["data"]["level_id"], 1);
    assert_eq!(body["data"]["badge"], "Badge1");

    // Other households keep their scores
    let other = app.member_token("kid3").await?;
    let (_, body) = read(app.get("/api/members", &other).await?).await?;
    assert_eq!(body["data"]["total_score"], 30);

    let (status, _) = read(
        app.patch("/api/households/household/scores", &app.other_parent_token().await?, json!({ "household_id": fx.household.id }))
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}
