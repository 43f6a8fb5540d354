//! API gateway.
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!   client ──────▶│ request id → trace → usage → panic guard → limits    │
//!                 │      │                                               │
//!                 │      ├─ /api/keys ............ keys::issuer          │
//!                 │      ├─ /api/keys/verify ..... keys::validator       │
//!                 │      ├─ /api/statistics ...... usage::counters       │
//!                 │      ├─ /api/battery-level, /api/messages            │
//!                 │      └─ fallback ............. upstream catalogue ───┼──▶ upstreams
//!                 │                                                      │
//!   admin ───────▶│ admin listener → admin::channel (privileged verbs)   │
//!                 │                                                      │
//!                 │ storage: keys / usage / board JSON snapshots         │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use api_gateway::config::{load_config, loader::finalize, watcher::ConfigWatcher};
use api_gateway::lifecycle::{wait_for_signal, Shutdown};
use api_gateway::observability::{logging, metrics};
use api_gateway::{GatewayConfig, HttpServer};

#[derive(Parser)]
#[command(name = "api-gateway", version, about = "API key and usage accounting gateway")]
struct Args {
    /// TOML config file. Without one, defaults plus GATEWAY_* environment apply.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => finalize(GatewayConfig::default(), |key| std::env::var(key).ok())?,
    };

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "api-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        upstream_routes = config.upstream.routes.len(),
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    // Hot reload only when there is a file to watch.
    let (updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(handle) => (rx, Some(handle)),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
                    (rx, None)
                }
            }
        }
        None => (mpsc::unbounded_channel().1, None),
    };

    let server = HttpServer::new(config.clone()).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, updates, stop).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
