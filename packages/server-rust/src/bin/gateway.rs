//! `switchboard-gateway`: serves the demo backends over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use metrics_exporter_prometheus::PrometheusBuilder;
use switchboard_core::Registry;
use switchboard_server::backends::register_all;
use switchboard_server::{NetworkConfig, NetworkModule};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

/// Path-addressed call gateway.
#[derive(Debug, Parser)]
#[command(name = "switchboard-gateway", version, about)]
struct Args {
    /// Bind address.
    #[arg(long, env = "SWITCHBOARD_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Listen port; 0 picks a free one.
    #[arg(long, env = "SWITCHBOARD_PORT", default_value_t = 4000)]
    port: u16,

    /// Allowed CORS origin; repeat for several. Defaults to any origin.
    #[arg(long = "cors-origin")]
    cors_origins: Vec<String>,

    /// Largest accepted request body in bytes.
    #[arg(long, default_value_t = 1024 * 1024)]
    max_body_bytes: usize,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Serve Prometheus metrics on this port.
    #[arg(long)]
    metrics_port: Option<u16>,
}

impl Args {
    fn network_config(&self) -> NetworkConfig {
        let defaults = NetworkConfig::default();
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            cors_origins: if self.cors_origins.is_empty() {
                defaults.cors_origins
            } else {
                self.cors_origins.clone()
            },
            max_body_bytes: self.max_body_bytes,
            api_prefix: defaults.api_prefix,
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        return;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    if let Some(port) = args.metrics_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to install prometheus exporter")?;
        info!(%addr, "metrics exporter listening");
    }

    let registry = Registry::new();
    register_all(&registry).context("failed to register backends")?;
    info!(%registry, "registered backends");

    let mut module = NetworkModule::new(args.network_config(), Arc::new(registry));
    let port = module.start().await?;
    info!(port, "gateway listening");

    module.serve(shutdown_signal()).await
}
