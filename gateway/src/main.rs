//! Live channel status gateway.
//!
//! Loads the channel list once at startup and serves the aggregated live
//! status of those channels over a small JSON API.

use anyhow::{Context, Result};
use clap::Parser;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use aggregator::StatusService;
use common::config::AppConfig;
use providers::{HttpTransport, ProviderRegistry, Transport, TransportConfig};

mod logging;
mod routes;

use logging::RunMode;
use routes::AppState;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL")]
    level: Option<String>,
    /// Run mode; release emits JSON logs
    #[arg(long, env = "RUN_MODE", value_enum, default_value_t = RunMode::Debug)]
    mode: RunMode,
    /// Path to the channel list
    #[arg(long, env = "CONFIG_PATH", default_value = "./config/config.json")]
    config: String,
    #[arg(long, env = "PORT", default_value_t = 8081)]
    port: u16,
    /// User-Agent sent to the platforms, overrides the config file
    #[arg(long, env = "USER_AGENT")]
    ua: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let level = args
        .level
        .clone()
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| logging::default_level().to_string());
    logging::init(args.mode, &level);

    let config = AppConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    // CLI/env > config file > built-in default
    let user_agent = args
        .ua
        .as_deref()
        .filter(|ua| !ua.is_empty())
        .or(config.user_agent.as_deref());
    let transport_config = TransportConfig::default().with_user_agent(user_agent);
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(transport_config).context("Failed to build HTTP transport")?);

    let registry = Arc::new(ProviderRegistry::with_default_providers(transport));
    let service = Arc::new(StatusService::new(config.channels, registry));
    let state = AppState { service };

    let app = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!(
        port = args.port,
        mode = args.mode.as_str(),
        log_level = %level,
        "Starting server"
    );
    info!("Config loaded from: {}", args.config);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
