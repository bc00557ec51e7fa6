//! Page-view gateway
//!
//! Records page views from a tracking pixel and serves view counts and
//! sessions per post.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌───────────────────────────────────────────────┐
//!                        │                 PAGEVIEW GATEWAY              │
//!                        │                                               │
//!     Client Request     │  ┌──────────┐    ┌───────────────────────┐    │
//!     ───────────────────┼─▶│   http   │───▶│   routing::Entrypoint │    │
//!                        │  │  server  │    │  prefix middlewares   │    │
//!                        │  └──────────┘    │  (meta, security)     │    │
//!                        │                  └──────────┬────────────┘    │
//!                        │                             ▼                 │
//!     Client Response    │                  ┌───────────────────────┐    │
//!     ◀──────────────────┼──────────────────│  pageviews handlers   │    │
//!                        │                  └──────────┬────────────┘    │
//!                        │                             ▼  wait_until     │
//!                        │                  ┌───────────────────────┐    │
//!                        │                  │     store (KvStore)   │    │
//!                        │                  └───────────────────────┘    │
//!                        │  config · observability · lifecycle           │
//!                        └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use pageview_gateway::config::{load_config, GatewayConfig};
use pageview_gateway::lifecycle::startup;
use pageview_gateway::observability::logging;

#[derive(Debug, Parser)]
#[command(name = "pageview-gateway", version, about)]
struct Cli {
    /// Path to a TOML configuration file. Built-in defaults when omitted.
    #[arg(short, long, env = "PAGEVIEW_GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?cli.config,
        "pageview-gateway starting"
    );

    startup::run(config).await?;
    Ok(())
}
