//! Tickerwatch API Server
//!
//! Serves the dashboard, the `/data` endpoint (one fetch cycle per request),
//! liveness and Prometheus metrics.

use dotenvy::dotenv;
use tickerwatch::config::AppConfig;
use tickerwatch::core::http::{start_server, AppState};
use tickerwatch::core::runtime::Runtime;
use tickerwatch::logging;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    logging::init_logging();

    let config = AppConfig::from_env()?;
    let port = config.port;

    let env = tickerwatch::config::get_environment();
    info!("Starting Tickerwatch API Server");
    info!(environment = %env, "Environment");
    info!(port = port, "HTTP Server: http://0.0.0.0:{}", port);
    info!(
        symbols = ?config.tracked.symbols().collect::<Vec<_>>(),
        "Tracking {} symbols",
        config.tracked.len()
    );

    let runtime = Runtime::from_config(config)?;
    let state = AppState::from_runtime(&runtime);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(port, state).await {
            error!(error = %e, "HTTP server error");
        }
    });

    info!("API server started, waiting for shutdown signal...");
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down API server...");
        }
        _ = server_handle => {
            error!("HTTP server stopped");
        }
    }

    Ok(())
}
