//! Tickerwatch Worker
//!
//! Runs the fetch cycle on a cron schedule and pushes a notification for
//! every symbol at or below its target price.

use dotenvy::dotenv;
use tickerwatch::config::AppConfig;
use tickerwatch::core::runtime::Runtime;
use tickerwatch::logging;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    logging::init_logging();

    let config = AppConfig::from_env()?;
    let environment = tickerwatch::config::get_environment();
    info!("Starting Tickerwatch Worker");
    info!(environment = %environment, "Environment");
    info!(schedule = %config.fetch_schedule, "Fetch schedule: {}", config.fetch_schedule);
    if config.pushbullet_token.is_none() {
        warn!("PUSHBULLET_TOKEN not set - alerts will only be logged");
    }

    let run_on_start = config.run_on_start;

    let runtime = Runtime::from_config(config)?;
    let scheduler = runtime.scheduler()?;

    if run_on_start {
        info!("Running initial fetch cycle...");
        let result = scheduler.run_once().await;
        info!(
            successful = result.summary.successful,
            failed = result.summary.failed,
            alerts = result.summary.alerts_triggered.len(),
            "Initial fetch cycle finished"
        );
    }

    scheduler.start().await?;

    info!("Worker started, waiting for shutdown signal...");
    signal::ctrl_c().await?;
    info!("Shutting down worker...");
    scheduler.stop().await;
    info!("Worker stopped");

    Ok(())
}
