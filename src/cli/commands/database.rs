use serde_json::json;

use crate::cli::utils::{output_rows, output_success};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::{DatabaseManager, HouseholdRepository, PgStore};

async fn connect() -> anyhow::Result<DatabaseManager> {
    let database = DatabaseManager::connect(&config().database).await?;
    Ok(database)
}

pub async fn migrate(output_format: OutputFormat) -> anyhow::Result<()> {
    let database = connect().await?;
    database.migrate().await?;
    database.close().await;

    output_success(output_format, "Migrations applied", None)
}

/// Zero a household's scores and levels outside of any parent session
pub async fn reset(household_id: i32, output_format: OutputFormat) -> anyhow::Result<()> {
    let database = connect().await?;
    let store = PgStore::new(database.pool().clone());

    if store.find_household(household_id).await?.is_none() {
        database.close().await;
        anyhow::bail!("Household {} not found", household_id);
    }

    store.reset_scores(household_id).await?;
    store.reset_levels(household_id).await?;
    let scores = store.household_scores(household_id).await?;
    database.close().await;

    let rows: Vec<_> = scores
        .iter()
        .map(|entry| json!({ "id": entry.id, "name": entry.name, "total_score": entry.total_score }))
        .collect();
    output_rows(output_format, &format!("Household {} reset", household_id), &rows)
}
