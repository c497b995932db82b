//! veil-server binary entry point.
//!
//! Usage:
//! ```bash
//! veil-server --config veilchat.toml
//! ```

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use veilchat_server::config::Config;
use veilchat_server::http::{build_router, health};
use veilchat_server::service::EncryptionService;
use veilchat_server::storage::SqliteModeStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = get_config_path();
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.as_str().into()),
        )
        .init();

    tracing::info!("veil-server v{}", env!("CARGO_PKG_VERSION"));

    let store = SqliteModeStore::new(&config.storage.database)
        .await
        .with_context(|| {
            format!(
                "failed to open database {}",
                config.storage.database.display()
            )
        })?;
    let service = Arc::new(EncryptionService::new(Arc::new(store)));

    let status = service
        .get_status()
        .await
        .context("failed to read encryption mode")?;
    tracing::info!("Encryption mode: {} ({})", status.mode, status.label);

    health::init_start_time();
    let app = build_router(service.clone(), config.http.clone());

    let listener = TcpListener::bind(&config.http.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.http.bind_address))?;
    tracing::info!("Listening on {}", config.http.bind_address);

    let shutdown_service = service.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown requested");
            // Open status streams never end on their own
            shutdown_service.shutdown();
        })
        .await
        .context("HTTP server failed")?;

    tracing::info!("veil-server stopped");
    Ok(())
}

fn get_config_path() -> PathBuf {
    std::env::args()
        .skip_while(|arg| arg != "--config")
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("veilchat.toml"))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Cannot install SIGTERM handler: {}", e);
                wait_for_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
