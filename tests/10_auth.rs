mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{read, TestApp};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (status, body) = read(app.client.get(app.url("/health")).send().await?).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn parent_registration_validates_fields_in_order() -> Result<()> {
    let app = TestApp::spawn().await?;
    let full = json!({ "name": "Jim Halpert", "username": "jim", "password": "11AAaa!!" });

    for field in ["name", "username", "password"] {
        let mut body = full.clone();
        body.as_object_mut().unwrap().remove(field);

        let (status, body) = read(app.client.post(app.url("/api/users")).json(&body).send().await?).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], format!("Missing '{}' in request body", field));
    }
    Ok(())
}

#[tokio::test]
async fn parent_registration_enforces_password_rules() -> Result<()> {
    let app = TestApp::spawn().await?;
    let cases = [
        ("AB123", "Password must be longer than 8 characters"),
        (" 11AAaa!!", "Password must not start or end with empty spaces"),
        ("11AAaabb", "Password must contain one upper case, lower case, number and special character"),
    ];

    for (password, message) in cases {
        let (status, body) = read(
            app.client
                .post(app.url("/api/users"))
                .json(&json!({ "name": "Jim", "username": "jim", "password": password }))
                .send()
                .await?,
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], message);
    }
    Ok(())
}

#[tokio::test]
async fn registered_parent_can_log_in() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (status, body) = read(
        app.client
            .post(app.url("/api/users"))
            .json(&json!({ "name": "Jim <b>Halpert</b>", "username": "jim", "password": "11AAaa!!" }))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["username"], "jim");
    assert_eq!(body["data"]["name"], "Jim &lt;b&gt;Halpert&lt;/b&gt;");
    assert!(body["data"].get("password").is_none());

    let (status, body) = read(
        app.client
            .post(app.url("/api/auth/token"))
            .json(&json!({ "username": "jim", "password": "11AAaa!!" }))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["type"], "user");
    assert!(body["data"]["authToken"].is_string());
    Ok(())
}

#[tokio::test]
async fn duplicate_parent_username_is_rejected() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (status, body) = read(
        app.client
            .post(app.url("/api/users"))
            .json(&json!({ "name": "Copy", "username": app.fixtures.parent.username, "password": "11AAaa!!" }))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Username already taken");
    Ok(())
}

#[tokio::test]
async fn bad_credentials_are_rejected() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (status, body) = read(
        app.client
            .post(app.url("/api/auth/token"))
            .json(&json!({ "username": "dunder", "password": "wrong" }))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Incorrect username or password");

    let (status, body) = read(
        app.client
            .post(app.url("/api/auth/token"))
            .json(&json!({ "password": "wrong" }))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing 'username' in request body");
    Ok(())
}

#[tokio::test]
async fn member_login_issues_member_token() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (status, body) = read(
        app.client
            .post(app.url("/api/membersAuth/token"))
            .json(&json!({ "username": "kid1", "password": "kid1" }))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["type"], "member");

    // A member account does not exist in the parent domain
    let (status, _) = read(
        app.client
            .post(app.url("/api/auth/token"))
            .json(&json!({ "username": "kid1", "password": "kid1" }))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (status, body) = read(app.client.get(app.url("/api/households")).send().await?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Missing bearer token");

    let (status, body) = read(
        app.client
            .get(app.url("/api/households"))
            .header("Authorization", "Basic abc")
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Missing bearer token");

    let (status, body) = read(app.get("/api/households", "not-a-token").await?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized request");
    Ok(())
}

#[tokio::test]
async fn token_for_another_secret_is_rejected() -> Result<()> {
    use chorerunner_api::auth::TokenService;
    use chorerunner_api::types::PrincipalKind;

    let app = TestApp::spawn().await?;
    let forged = TokenService::new("some-other-secret", 3);
    let token = forged.issue(&forged.claims(PrincipalKind::User, "dunder", app.fixtures.parent.id, "Dunder", None))?;

    let (status, body) = read(app.get("/api/households", &token).await?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized request");
    Ok(())
}

#[tokio::test]
async fn tokens_can_be_refreshed() -> Result<()> {
    let app = TestApp::spawn().await?;

    let parent = app.parent_token().await?;
    let res = app.client.put(app.url("/api/auth/token")).bearer_auth(&parent).send().await?;
    let (status, body) = read(res).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["type"], "user");

    let member = app.member_token("kid1").await?;
    let res = app.client.put(app.url("/api/membersAuth/token")).bearer_auth(&member).send().await?;
    let (status, body) = read(res).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["type"], "member");

    // Refresh is scoped to the token's own domain
    let res = app.client.put(app.url("/api/auth/token")).bearer_auth(&member).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}
