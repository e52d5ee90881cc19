//! Axum API server binary.

use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use playcoach_api::{create_router, metrics, ApiConfig, AppState};
use playcoach_worker::init_tracing;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    init_tracing("playcoach=info");

    info!("Starting playcoach-api");

    let config = ApiConfig::from_env();
    info!(
        "API config: host={}, port={}, upload_folder={}",
        config.host,
        config.port,
        config.upload_folder.display()
    );
    for var in ["SESSION_SECRET", "ENCRYPTION_KEY"] {
        if std::env::var(var).map_or(true, |v| v.is_empty()) {
            if config.is_production() {
                warn!("{} not set in production, saved API keys will not survive a restart", var);
            } else {
                info!("{} not set, saved API keys will not survive a restart", var);
            }
        }
    }

    let state = match AppState::new(config.clone()).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create application state: {}", e);
            std::process::exit(1);
        }
    };

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics())
    } else {
        None
    };

    let shutdown = state.shutdown.clone();
    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid bind address");

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Server shutdown complete");
}

/// Wait for Ctrl+C, then cancel background analyses.
async fn shutdown_signal(background: CancellationToken) {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Received shutdown signal");
    background.cancel();
}
