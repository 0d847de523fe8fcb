use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jobtrack_core::DateRange;
use jobtrack_service::{JobService, RelayConfig, RunMode};
use jobtrack_web::AppState;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "jobtrack")]
#[command(about = "Job posting tracker backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the HTTP API (default).
    Serve,
    /// Print application stats as JSON.
    Stats {
        /// PASTWEEK, PASTMONTH or PASTYEAR.
        #[arg(long)]
        range: Option<String>,
    },
    /// Print the application streak as JSON.
    Streak,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let mode = RunMode::from_env_value(std::env::var("MODE").ok().as_deref());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| mode.default_log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RelayConfig::from_env().context("loading configuration")?;
    let service = JobService::from_config(&config)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            info!(mode = ?config.mode, port = config.port, "starting jobtrack");
            jobtrack_web::serve(AppState::new(service), config.port).await?;
        }
        Commands::Stats { range } => {
            let stats = service.stats(DateRange::from_query(range.as_deref())).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Streak => {
            let streak = service.streak().await?;
            println!("{}", serde_json::to_string_pretty(&streak)?);
        }
    }

    Ok(())
}
