//! pollination-alerts: operator command for the alert engine.

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use pollination_alerts::{
    config::{self, AppConfig, database},
    core::{AlertScheduler, format_sweep_summary, inbox, last_sweep_at},
    errors::Result,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pollination-alerts")]
#[command(about = "Temporal alerts for pollination and germination records")]
struct Cli {
    /// Configuration file; must exist if given. Without it, $POLLINATION_CONFIG or
    /// ./config.toml is read, and a missing file there means built-in defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sweep on the configured interval until Ctrl-C
    Run,
    /// Run one sweep now
    Sweep {
        /// Evaluate as of this day (YYYY-MM-DD) instead of today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Dismiss pending alerts older than the configured age
    DismissStale,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    let cli = Cli::parse();

    // 3. Load the engine configuration
    let app_config: AppConfig = match &cli.config {
        Some(path) => config::load_config(path),
        None => config::load_default_config(),
    }
    .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Initialize database
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;

    match cli.command {
        Command::Run => {
            if let Some(previous) = last_sweep_at(&db).await? {
                info!("Last alert sweep completed at {}", previous);
            }
            let scheduler = AlertScheduler::from_config(db, &app_config.scheduler);
            scheduler
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                    }
                })
                .await;
        }
        Command::Sweep { date } => {
            let now = date.map_or_else(Utc::now, |day| day.and_time(Utc::now().time()).and_utc());
            let scheduler = AlertScheduler::from_config(db, &app_config.scheduler);
            if let Some(report) = scheduler.trigger_now(now).await? {
                println!("{}", format_sweep_summary(&report));
            }
        }
        Command::DismissStale => {
            let dismissed =
                inbox::dismiss_stale_alerts(&db, app_config.inbox.stale_after_days, Utc::now())
                    .await?;
            println!("Dismissed {dismissed} stale alerts");
        }
    }

    Ok(())
}
