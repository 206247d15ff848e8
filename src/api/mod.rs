use std::sync::Arc;

use axum::{
    http::{HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{get, patch, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::TokenService;
use crate::database::{CredentialStore, DatabaseManager, HouseholdRepository};
use crate::handlers::{protected, public};
use crate::middleware::authenticate;
use crate::services::{AuthService, HouseholdService};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub households: HouseholdService,
    /// Present when backed by Postgres; reported by `/health`
    pub database: Option<DatabaseManager>,
}

impl AppState {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        repo: Arc<dyn HouseholdRepository>,
        tokens: TokenService,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            auth: AuthService::new(credentials.clone(), tokens, bcrypt_cost),
            households: HouseholdService::new(repo, credentials, bcrypt_cost),
            database: None,
        }
    }

    pub fn with_database(mut self, database: DatabaseManager) -> Self {
        self.database = Some(database);
        self
    }
}

/// Full application router
pub fn router(state: AppState, client_origin: &str) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .layer(cors_layer(client_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use public::{auth, users};

    Router::new()
        .route("/api/users", post(users::users_post))
        .route("/api/auth/token", post(auth::user_token_post))
        .route("/api/membersAuth/token", post(auth::member_token_post))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{account, auth, households, members, scores, tasks};

    Router::new()
        // Token refresh
        .route("/api/auth/token", axum::routing::put(auth::user_token_put))
        .route("/api/membersAuth/token", axum::routing::put(auth::member_token_put))
        // Principal views
        .route("/api/users", get(account::users_get))
        .route("/api/members", get(account::members_get))
        // Households
        .route(
            "/api/households",
            get(households::households_get).post(households::households_post),
        )
        .route("/api/households/members", get(households::household_members_get))
        .route(
            "/api/households/household/scores",
            get(scores::scores_get).patch(scores::scores_patch),
        )
        .route(
            "/api/households/:household_id",
            patch(households::household_patch).delete(households::household_delete),
        )
        // Members
        .route(
            "/api/households/:household_id/members",
            get(members::members_get)
                .post(members::members_post)
                .delete(members::members_delete),
        )
        .route(
            "/api/households/:household_id/members/:member_id",
            patch(members::member_patch),
        )
        .route(
            "/api/households/:household_id/members/:member_id/tasks",
            get(members::member_tasks_get).patch(members::member_tasks_patch),
        )
        // Tasks
        .route(
            "/api/households/:household_id/tasks",
            get(tasks::tasks_get)
                .post(tasks::tasks_post)
                .patch(tasks::tasks_patch),
        )
        .route(
            "/api/households/:household_id/tasks/status",
            get(tasks::tasks_status_get),
        )
        .route(
            "/api/households/:household_id/tasks/status/:task_id",
            get(tasks::task_status_get).patch(tasks::task_status_patch),
        )
        .route(
            "/api/households/:household_id/tasks/:task_id",
            axum::routing::delete(tasks::task_delete),
        )
        .route_layer(from_fn_with_state(state, authenticate))
}

/// Restrict CORS to the configured client origin; `*` allows any origin
fn cors_layer(client_origin: &str) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if client_origin == "*" {
        return base.allow_origin(Any);
    }
    match client_origin.parse::<HeaderValue>() {
        Ok(origin) => base.allow_origin(origin),
        Err(e) => {
            tracing::warn!("Invalid CLIENT_ORIGIN '{}': {}; allowing any origin", client_origin, e);
            base.allow_origin(Any)
        }
    }
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Chorerunner API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "public": "/api/users (POST), /api/auth/token (POST), /api/membersAuth/token (POST)",
                "parent": "/api/users, /api/households[/:household_id[/members|/tasks]]",
                "member": "/api/members, /api/households/household/scores",
            }
        }
    }))
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    let Some(database) = &state.database else {
        return (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "memory" }
            })),
        );
    };

    match database.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "ok" }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": true,
                    "message": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": { "status": "degraded", "timestamp": now }
                })),
            )
        }
    }
}
