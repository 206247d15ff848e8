use std::time::Duration;

use serde_json::Value;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;

/// GET `<url>/health` and report the result
pub async fn health(url: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let base = url.unwrap_or_else(|| format!("http://localhost:{}", config().server.port));
    let endpoint = format!("{}/health", base.trim_end_matches('/'));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;
    let response = client.get(&endpoint).send().await?;
    let status = response.status();
    let body: Value = response.json().await?;

    if !status.is_success() {
        anyhow::bail!("{} answered {}: {}", endpoint, status, body);
    }

    output_success(
        output_format,
        &format!("{} is healthy", base),
        body.get("data").cloned(),
    )
}
