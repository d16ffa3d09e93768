mod config;

use std::sync::Arc;

use cdio_api::{ApiClient, WatchGateway};
use cdio_metrics::{ExporterState, exporter_router};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, filter::ParseError};

use crate::config::{Cli, ExporterConfig};

const DEFAULT_LOG_DIRECTIVE: &str = "cdio=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = log_filter(cli.log_level.as_deref(), rust_log.as_deref())?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = ExporterConfig::from_cli(&cli).inspect_err(|err| {
        error!(error = %err, "invalid configuration");
    })?;

    let gateway: Arc<dyn WatchGateway> = Arc::new(ApiClient::with_timeout(
        config.api_base_url.as_str(),
        config.api_key.clone(),
        config.request_timeout,
    ));
    let state = Arc::new(ExporterState::new(gateway)?);
    info!(
        families = state.registry.descriptors().len(),
        upstream = %config.api_base_url,
        "registered metric collectors"
    );

    let app = exporter_router(state, &config.metrics_path);
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(
        "changedetection.io exporter listening on {} (metrics at {})",
        config.listen_addr, config.metrics_path
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

/// `--log-level` wins over `RUST_LOG`; an unparsable `RUST_LOG` falls back to
/// the default directive while a bad `--log-level` is an error.
fn log_filter(log_level: Option<&str>, rust_log: Option<&str>) -> Result<EnvFilter, ParseError> {
    if let Some(directive) = log_level {
        return EnvFilter::try_new(directive);
    }

    Ok(rust_log
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_DIRECTIVE)))
}
