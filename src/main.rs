use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use chorerunner_api::api::{self, AppState};
use chorerunner_api::auth::TokenService;
use chorerunner_api::config;
use chorerunner_api::database::{DatabaseManager, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    let default_filter = if chorerunner_api::is_development!() {
        "chorerunner_api=debug,tower_http=debug"
    } else {
        "chorerunner_api=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = config::config();
    tracing::info!("Starting Chorerunner API in {:?} mode", config.environment);

    let database = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    database.migrate().await.context("failed to apply migrations")?;

    let store = Arc::new(PgStore::new(database.pool().clone()));
    let state = AppState::new(
        store.clone(),
        store,
        TokenService::from_config(&config.security),
        config.security.bcrypt_cost,
    )
    .with_database(database.clone());

    let app = api::router(state, &config.server.client_origin);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Chorerunner API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    database.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
