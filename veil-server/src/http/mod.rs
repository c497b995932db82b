//! HTTP endpoints for veil-server.
//!
//! Exposes the encryption service as JSON endpoints and an SSE status
//! stream, plus health and metrics.

mod encryption;
pub mod health;
mod metrics;

use crate::config::HttpConfig;
use crate::error::ServerError;
use crate::service::EncryptionService;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::json;
use std::sync::Arc;

pub use encryption::{
    DecryptRequest, DecryptResponse, EncryptRequest, UpdateModeRequest, UpdateModeResponse,
};
pub use health::HealthStatus;

/// Build the HTTP router with all endpoints.
pub fn build_router(service: Arc<EncryptionService>, config: HttpConfig) -> Router {
    let mut router = Router::new()
        .route(
            "/api/encryption",
            get(encryption::status_handler).put(encryption::update_handler),
        )
        .route("/api/encryption/stream", get(encryption::stream_handler))
        .route("/api/encryption/encrypt", post(encryption::encrypt_handler))
        .route("/api/encryption/decrypt", post(encryption::decrypt_handler))
        .route("/health", get(health::health_handler));

    if config.metrics_enabled {
        router = router.route("/metrics", get(metrics::metrics_handler));
    }

    router
        .layer(Extension(service))
        .layer(Extension(Arc::new(config)))
}

/// Error returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Caller lacks the admin token.
    #[error("admin token required")]
    Forbidden,

    /// Service error.
    #[error(transparent)]
    Service(#[from] ServerError),
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::Service(ServerError::Mode(e)) => (StatusCode::BAD_REQUEST, e.kind()),
            ApiError::Service(ServerError::Storage(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage")
            }
            ApiError::Service(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": kind,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}
