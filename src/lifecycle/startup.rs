//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize subsystems in dependency order (logging, metrics, tool table)
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;
use std::path::Path;

use tokio::net::TcpListener;

use crate::config::{self, ConfigError, GatewayConfig};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::{logging, metrics};
use crate::routing::tools::{check_table, TableError, TOOLS};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("metrics address '{0}' is invalid")]
    MetricsAddress(String),

    #[error("metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("tool table: {}", join(.0))]
    ToolTable(Vec<TableError>),

    #[error("HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("listener: {0}")]
    Io(#[from] std::io::Error),
}

fn join(errors: &[TableError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Everything after configuration: metrics, tool table check, bind, serve.
pub async fn serve(config: GatewayConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    check_table(TOOLS).map_err(StartupError::ToolTable)?;

    let server = HttpServer::new(config)?;
    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}

/// Full process startup for the gateway binary.
pub async fn run(config_path: Option<&Path>) -> Result<(), StartupError> {
    let config = config::load(config_path)?;
    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        registry = %config.registry.path,
        auth_enabled = config.auth.enabled,
        ws_proxy_port = config.websocket.port,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(&shutdown);

    serve(config, &shutdown).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
