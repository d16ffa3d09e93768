use std::time::Duration;

use cdio_common::error::{CdioError, Result};
use cdio_metrics::router::{HEALTH_LIVE_PATH, HEALTH_READY_PATH};
use clap::Parser;
use url::Url;

#[derive(Parser, Debug)]
#[command(
    name = "cdio-exporter",
    about = "Prometheus exporter for changedetection.io",
    version
)]
pub struct Cli {
    /// Base URL of the changedetection.io instance, without `/api/v1`.
    #[arg(long, env = "CDIO_API_BASE_URL")]
    pub api_base_url: Option<String>,

    #[arg(long, env = "CDIO_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 9123)]
    pub port: u16,

    #[arg(long, env = "CDIO_REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,

    #[arg(long, env = "CDIO_METRICS_PATH", default_value = "/metrics")]
    pub metrics_path: String,

    /// tracing filter directive, e.g. `debug` or `cdio=debug,tower_http=info`.
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub api_base_url: Url,
    pub api_key: String,
    pub listen_addr: String,
    pub request_timeout: Duration,
    pub metrics_path: String,
}

impl ExporterConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let (Some(api_base_url), Some(api_key)) = (
            cli.api_base_url.as_deref().map(str::trim).filter(|value| !value.is_empty()),
            cli.api_key.as_deref().map(str::trim).filter(|value| !value.is_empty()),
        ) else {
            return Err(CdioError::InvalidArgument(
                "CDIO_API_BASE_URL and CDIO_API_KEY must be set".to_string(),
            ));
        };

        let api_base_url = parse_base_url(api_base_url)?;

        if !cli.metrics_path.starts_with('/') {
            return Err(CdioError::InvalidArgument(format!(
                "metrics path must start with '/': {}",
                cli.metrics_path
            )));
        }
        if cli.metrics_path.contains([':', '{', '}', '*']) {
            return Err(CdioError::InvalidArgument(format!(
                "metrics path must be a literal route: {}",
                cli.metrics_path
            )));
        }
        if cli.metrics_path == HEALTH_LIVE_PATH || cli.metrics_path == HEALTH_READY_PATH {
            return Err(CdioError::InvalidArgument(format!(
                "metrics path collides with health route: {}",
                cli.metrics_path
            )));
        }

        if cli.request_timeout_secs == 0 {
            return Err(CdioError::InvalidArgument(
                "request timeout must be at least one second".to_string(),
            ));
        }

        Ok(Self {
            api_base_url,
            api_key: api_key.to_string(),
            listen_addr: format!("{}:{}", cli.host, cli.port),
            request_timeout: Duration::from_secs(cli.request_timeout_secs),
            metrics_path: cli.metrics_path.clone(),
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|err| {
        CdioError::InvalidArgument(format!("invalid CDIO_API_BASE_URL {raw:?}: {err}"))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(CdioError::InvalidArgument(format!(
            "CDIO_API_BASE_URL must use http or https: {raw}"
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(CdioError::InvalidArgument(format!(
            "CDIO_API_BASE_URL has no host: {raw}"
        )));
    }

    Ok(url)
}
