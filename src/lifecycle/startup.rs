//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start background tasks (metrics exporter, signal handler)
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_handler;
use crate::observability::metrics;
use crate::pageviews::{build_gateway, AppEnv};
use crate::routing::error::RouterError;
use crate::store::{KvStore, MemoryStore};

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("route registration failed: {0}")]
    Router(#[from] RouterError),

    #[error("invalid metrics address \"{0}\"")]
    MetricsAddress(String),

    #[error("metrics exporter failed: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("listener error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the page-view server on an already bound listener.
pub fn build_server(
    config: &GatewayConfig,
    shutdown: &Shutdown,
) -> Result<HttpServer<AppEnv>, StartupError> {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::with_list_limit(config.store.list_limit));
    tracing::info!(backend = store.name(), "Store ready");

    let env = Arc::new(AppEnv::new(store, config));
    let entry = build_gateway(config)?;

    Ok(HttpServer::new(
        entry,
        env,
        &config.timeouts,
        &config.security,
        shutdown.subscribe(),
    ))
}

/// Run the gateway until a shutdown signal arrives.
pub async fn run(config: GatewayConfig) -> Result<(), StartupError> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        extended = config.router.extended,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let shutdown = Arc::new(Shutdown::new());
    let server = build_server(&config, &shutdown)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let signals = spawn_signal_handler(shutdown.clone());
    server.run(listener).await?;
    signals.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}
