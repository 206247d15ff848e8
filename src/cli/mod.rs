pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "chore")]
#[command(about = "Chorerunner CLI - database maintenance and scoring tools")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Reset every score and level in a household")]
    Reset {
        #[arg(help = "Household id")]
        household_id: i32,
    },

    #[command(about = "Preview the outcome of approving a task, without touching the database")]
    Preview {
        #[arg(long, help = "Member's current total score")]
        score: i32,
        #[arg(long, help = "Member's current level")]
        level: i32,
        #[arg(long, help = "Points carried by the task")]
        points: i32,
    },

    #[command(about = "Check a running server's /health endpoint")]
    Health {
        #[arg(long, help = "Server base URL (defaults to the configured local port)")]
        url: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::database::migrate(output_format).await,
        Commands::Reset { household_id } => commands::database::reset(household_id, output_format).await,
        Commands::Preview { score, level, points } => {
            commands::scoring::preview(score, level, points, output_format)
        }
        Commands::Health { url } => commands::server::health(url, output_format).await,
    }
}
