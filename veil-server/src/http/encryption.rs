//! Encryption mode endpoints.

use super::ApiError;
use crate::config::HttpConfig;
use crate::service::{EncryptedText, EncryptionService};
use axum::{
    http::{
        header::{AUTHORIZATION, CACHE_CONTROL},
        HeaderMap,
    },
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Extension, Json,
};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use veil_types::StatusSnapshot;

/// Body of `PUT /api/encryption`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateModeRequest {
    /// Requested mode id.
    pub mode: String,
}

/// Response of `PUT /api/encryption`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateModeResponse {
    /// Status after the request.
    pub status: StatusSnapshot,
    /// Whether the mode changed.
    pub updated: bool,
}

/// Body of `POST /api/encryption/encrypt`.
#[derive(Debug, Clone, Deserialize)]
pub struct EncryptRequest {
    /// Message body to encrypt.
    pub plaintext: String,
}

/// Body of `POST /api/encryption/decrypt`.
#[derive(Debug, Clone, Deserialize)]
pub struct DecryptRequest {
    /// Stored message body.
    pub ciphertext: String,
    /// Mode recorded with the message.
    pub mode: String,
}

/// Response of `POST /api/encryption/decrypt`.
#[derive(Debug, Clone, Serialize)]
pub struct DecryptResponse {
    /// Recovered message body.
    pub plaintext: String,
}

/// Current status.
pub async fn status_handler(
    Extension(service): Extension<Arc<EncryptionService>>,
) -> Result<Json<StatusSnapshot>, ApiError> {
    Ok(Json(service.get_status().await?))
}

/// Change the current mode.
///
/// When an admin token is configured the request must carry it as
/// `Authorization: Bearer <token>`.
pub async fn update_handler(
    Extension(service): Extension<Arc<EncryptionService>>,
    Extension(config): Extension<Arc<HttpConfig>>,
    headers: HeaderMap,
    Json(request): Json<UpdateModeRequest>,
) -> Result<Json<UpdateModeResponse>, ApiError> {
    if let Some(expected) = config.admin_token.as_deref() {
        let presented = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        if presented != Some(expected) {
            tracing::warn!("Rejected mode change to {}: missing admin token", request.mode);
            return Err(ApiError::Forbidden);
        }
    }

    let change = service.set_mode(&request.mode).await?;
    Ok(Json(UpdateModeResponse {
        status: change.status,
        updated: change.changed,
    }))
}

/// Live status stream as server-sent events.
pub async fn stream_handler(
    Extension(service): Extension<Arc<EncryptionService>>,
    Extension(config): Extension<Arc<HttpConfig>>,
) -> Result<impl IntoResponse, ApiError> {
    let changes = service.open_change_stream().await?;
    let subscriber = changes.subscriber_id();

    // An Err item ends the response body, and with it the subscription
    let events = changes.map(move |snapshot| {
        Event::default().json_data(&snapshot).inspect_err(|e| {
            tracing::warn!("Closing stream {}: cannot serialize status: {}", subscriber, e);
        })
    });

    let keep_alive = KeepAlive::new().interval(Duration::from_secs(config.keepalive_secs));
    Ok((
        [(CACHE_CONTROL, "no-cache")],
        Sse::new(events).keep_alive(keep_alive),
    ))
}

/// Encrypt a message body under the current mode.
pub async fn encrypt_handler(
    Extension(service): Extension<Arc<EncryptionService>>,
    Json(request): Json<EncryptRequest>,
) -> Result<Json<EncryptedText>, ApiError> {
    Ok(Json(service.encrypt(&request.plaintext).await?))
}

/// Decrypt a message body with its recorded mode.
pub async fn decrypt_handler(
    Extension(service): Extension<Arc<EncryptionService>>,
    Json(request): Json<DecryptRequest>,
) -> Result<Json<DecryptResponse>, ApiError> {
    let plaintext = service.decrypt(&request.ciphertext, &request.mode)?;
    Ok(Json(DecryptResponse { plaintext }))
}
