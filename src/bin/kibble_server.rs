//! `kibble-server`: serves density estimates over HTTP.
//!
//! Tracing output goes to stderr. Configuration comes from `KIBBLE_CONFIG`
//! (or `~/.config/kibble-density/config.toml`) plus environment overrides.

use std::sync::Arc;

use kibble_density::{EstimateServer, Secrets, ServiceConfig};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("kibble-server starting");

    let config = ServiceConfig::load()?;
    let shutdown = CancellationToken::new();
    let estimator = config.build_estimator(&Secrets::from_env(), shutdown.clone())?;

    let mut server = EstimateServer::start(Arc::new(estimator), &config.server, shutdown.clone())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "kibble-server failed to start");
            anyhow::anyhow!("kibble-server failed: {e}")
        })?;

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        tracing::info!("shutdown requested");
        signal_token.cancel();
    });

    server.wait().await;

    tracing::info!("kibble-server shut down cleanly");
    Ok(())
}
