//! Health check endpoint.

use crate::service::EncryptionService;
use axum::{Extension, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use veil_types::EncryptionMode;

/// Global start time for uptime calculation.
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time (call once at startup).
pub fn init_start_time() {
    START_TIME.get_or_init(Instant::now);
}

/// Health status response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// `ok`, or `degraded` when the mode store cannot be read.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Current mode, if readable.
    pub mode: Option<EncryptionMode>,
    /// Number of open status streams.
    pub subscribers: usize,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// Health check handler.
pub async fn health_handler(
    Extension(service): Extension<Arc<EncryptionService>>,
) -> Json<HealthStatus> {
    let uptime = START_TIME
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0);

    let mode = match service.get_mode().await {
        Ok(mode) => Some(mode),
        Err(e) => {
            tracing::error!("Health check cannot read mode: {}", e);
            None
        }
    };

    Json(HealthStatus {
        status: if mode.is_some() { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        mode,
        subscribers: service.notifier().subscriber_count(),
        uptime_seconds: uptime,
    })
}
