//! Forecast Ledger API Server
//!
//! HTTP API with health check, metrics and the prediction endpoint.
//! Ledger writes from concurrent requests are serialized through one writer.

use dotenvy::dotenv;
use forecast_ledger::config::{get_environment, AppConfig};
use forecast_ledger::core::http::start_server;
use forecast_ledger::logging;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    logging::init_logging();

    let config = AppConfig::from_env();
    let port = config.port;

    info!("Starting Forecast Ledger API Server");
    info!(environment = %get_environment(), "Environment");
    info!(port = port, "HTTP Server: http://0.0.0.0:{}", port);
    info!(
        rpc_url = %config.ledger.rpc_url,
        descriptor = %config.ledger.descriptor_path.display(),
        account_configured = config.ledger.account.is_some(),
        "Ledger"
    );

    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(config).await {
            error!(error = %e, "HTTP server error");
        }
    });

    info!("API server started, waiting for shutdown signal...");
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down API server...");
            info!("API server stopped");
        }
        _ = server_handle => {
            error!("HTTP server stopped");
        }
    }

    Ok(())
}
