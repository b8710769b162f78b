//! tx-mediator: transactional request/reply mediation.
//!
//! # Architecture Overview
//!
//! ```text
//!     Caller                 ┌──────────────────────────────────────────────────────┐
//!     POST /requests ───────▶│  http::server ──▶ Gateway::send                      │
//!                            │                     │ register slot (CorrelationTable)│
//!                            │                     ▼                                 │
//!                            │                 QueueBridge ◀──── rollback (front)   │
//!                            │                     │                  ▲              │
//!                            │                     ▼                  │              │
//!                            │   worker ──▶ TransactionController ────┘              │
//!                            │                     │ BackendInvoker ───────────────┼──▶ Backend
//!                            │                     │ routing::decide               │
//!                            │                     │ reply::compose                │
//!                            │                     ▼ commit → fulfill              │
//!     reply / 504 ◀──────────│  CorrelationTable slot                               │
//!                            └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use tx_mediator::admin::{setup_admin_router, AdminState};
use tx_mediator::config::watcher::ConfigWatcher;
use tx_mediator::config::{load_config, MediatorConfig};
use tx_mediator::engine::{Mediator, MediatorError};
use tx_mediator::http::{AppState, HttpServer};
use tx_mediator::lifecycle::{shutdown_signal, Shutdown};
use tx_mediator::observability::{logging, metrics};
use tx_mediator::routing::RedeliveryPolicy;

#[derive(Parser)]
#[command(name = "tx-mediator", version, about = "Transactional request/reply mediator")]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), MediatorError> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => MediatorConfig::default(),
    };

    if let Err(e) = logging::init_tracing(&config.observability) {
        eprintln!("tracing already initialised: {}", e);
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tx-mediator starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = %config.backend.url,
        workers = config.queue.workers,
        max_redeliveries = ?config.queue.max_redeliveries,
        default_deadline_ms = config.gateway.default_deadline_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address, metrics disabled"
            ),
        }
    }

    let mediator = Mediator::builder(config.clone()).start().await?;
    let shutdown = Shutdown::new();
    let mut servers = Vec::new();

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(
        &config.listener,
        AppState {
            gateway: mediator.gateway().clone(),
        },
    );
    let rx = shutdown.subscribe();
    servers.push(tokio::spawn(async move { server.run(listener, rx).await }));

    if config.admin.enabled {
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %config.admin.bind_address, "Admin API listening");
        let router = setup_admin_router(AdminState::new(&mediator, config.admin.api_key.clone()));
        let mut rx = shutdown.subscribe();
        servers.push(tokio::spawn(async move {
            axum::serve(admin_listener, router)
                .with_graceful_shutdown(async move {
                    let _ = rx.recv().await;
                })
                .await
        }));
    }

    // Keep the watcher alive for the life of the process.
    let _watcher = match &args.config {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let bridge = std::sync::Arc::clone(mediator.bridge());
            tokio::spawn(async move {
                while let Some(new_config) = updates.recv().await {
                    bridge.set_policy(RedeliveryPolicy::from(&new_config.queue));
                }
            });
            match watcher.run() {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    tracing::warn!(error = %e, "Config hot reload disabled");
                    None
                }
            }
        }
        None => None,
    };

    shutdown_signal().await;
    shutdown.trigger();

    // Release callers blocked in /requests before draining the listeners.
    mediator.shutdown().await;

    for server in servers {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Server exited with error"),
            Err(e) => tracing::error!(error = %e, "Server task failed"),
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
