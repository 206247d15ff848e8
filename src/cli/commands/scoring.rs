use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::scoring::{apply_approval, next_level_gap, LEVEL_CAP};

pub fn preview(score: i32, level: i32, points: i32, output_format: OutputFormat) -> anyhow::Result<()> {
    if !(1..=LEVEL_CAP).contains(&level) {
        anyhow::bail!("level must be between 1 and {}", LEVEL_CAP);
    }
    if points <= 0 {
        anyhow::bail!("points must be positive");
    }

    let update = apply_approval(score, level, points)?;
    output_success(
        output_format,
        if update.level_changed { "Approval levels up" } else { "Approval keeps level" },
        Some(json!({
            "total_score": update.new_score,
            "level_id": update.new_level,
            "nextLevel": next_level_gap(update.new_level, update.new_score),
        })),
    )
}
