#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

use chorerunner_api::api::{self, AppState};
use chorerunner_api::auth::TokenService;
use chorerunner_api::testing::{seed_fixtures, Fixtures, MemoryStore, PARENT_PASSWORD};

pub const JWT_SECRET: &str = "integration-secret";

/// A server bound to a free local port, backed by a freshly seeded in-memory store
pub struct TestApp {
    pub base_url: String,
    pub client: Client,
    pub store: Arc<MemoryStore>,
    pub fixtures: Fixtures,
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let fixtures = seed_fixtures(store.as_ref(), 4).await?;

        let state = AppState::new(store.clone(), store.clone(), TokenService::new(JWT_SECRET, 3), 4);
        let app = api::router(state, "*");

        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let app = Self {
            base_url: format!("http://127.0.0.1:{}", port),
            client: Client::new(),
            store,
            fixtures,
        };
        app.wait_ready(Duration::from_secs(5)).await?;
        Ok(app)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn parent_token(&self) -> Result<String> {
        self.login("/api/auth/token", &self.fixtures.parent.username, PARENT_PASSWORD).await
    }

    pub async fn other_parent_token(&self) -> Result<String> {
        self.login("/api/auth/token", &self.fixtures.other_parent.username, PARENT_PASSWORD).await
    }

    /// Fixture member passwords equal their usernames
    pub async fn member_token(&self, username: &str) -> Result<String> {
        self.login("/api/membersAuth/token", username, username).await
    }

    async fn login(&self, path: &str, username: &str, password: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url(path))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());
        let body: Value = res.json().await?;
        body["data"]["authToken"]
            .as_str()
            .map(str::to_string)
            .context("response carried no authToken")
    }

    pub async fn get(&self, path: &str, token: &str) -> Result<Response> {
        Ok(self.client.get(self.url(path)).bearer_auth(token).send().await?)
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Result<Response> {
        Ok(self.client.post(self.url(path)).bearer_auth(token).json(&body).send().await?)
    }

    pub async fn patch(&self, path: &str, token: &str, body: Value) -> Result<Response> {
        Ok(self.client.patch(self.url(path)).bearer_auth(token).json(&body).send().await?)
    }

    pub async fn delete(&self, path: &str, token: &str, body: Value) -> Result<Response> {
        Ok(self.client.delete(self.url(path)).bearer_auth(token).json(&body).send().await?)
    }
}

/// Status and parsed JSON body of a response
pub async fn read(res: Response) -> Result<(StatusCode, Value)> {
    let status = res.status();
    if status == StatusCode::NO_CONTENT {
        return Ok((status, Value::Null));
    }
    Ok((status, res.json().await?))
}
