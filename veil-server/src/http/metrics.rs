//! Prometheus metrics endpoint.

use crate::service::EncryptionService;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::fmt::Write;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use veil_types::EncryptionMode;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
/// Includes both gauges (current state) and counters (monotonic since startup).
pub async fn metrics_handler(
    Extension(service): Extension<Arc<EncryptionService>>,
) -> impl IntoResponse {
    let current = service.get_mode().await.ok();
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        render(&service, current),
    )
}

fn render(service: &EncryptionService, current: Option<EncryptionMode>) -> String {
    let m = service.metrics();

    // Gauges
    let subscribers = service.notifier().subscriber_count();

    // Counters
    let changes = m.mode_changes_total.load(Ordering::Relaxed);
    let noops = m.mode_change_noops_total.load(Ordering::Relaxed);
    let encrypts = m.encrypt_total.load(Ordering::Relaxed);
    let decrypts = m.decrypt_total.load(Ordering::Relaxed);
    let decrypt_failures = m.decrypt_failures_total.load(Ordering::Relaxed);
    let streams = m.streams_opened_total.load(Ordering::Relaxed);

    let mut body = format!(
        r#"# HELP veilchat_info Server information
# TYPE veilchat_info gauge
veilchat_info{{version="{version}"}} 1

# HELP veilchat_stream_subscribers Number of open status streams
# TYPE veilchat_stream_subscribers gauge
veilchat_stream_subscribers {subscribers}

# HELP veilchat_mode_changes_total Mode changes that altered the stored mode
# TYPE veilchat_mode_changes_total counter
veilchat_mode_changes_total {changes}

# HELP veilchat_mode_change_noops_total Mode change requests matching the current mode
# TYPE veilchat_mode_change_noops_total counter
veilchat_mode_change_noops_total {noops}

# HELP veilchat_encrypt_total Messages encrypted
# TYPE veilchat_encrypt_total counter
veilchat_encrypt_total {encrypts}

# HELP veilchat_decrypt_total Messages decrypted
# TYPE veilchat_decrypt_total counter
veilchat_decrypt_total {decrypts}

# HELP veilchat_decrypt_failures_total Rejected decrypt requests
# TYPE veilchat_decrypt_failures_total counter
veilchat_decrypt_failures_total {decrypt_failures}

# HELP veilchat_streams_opened_total Status streams opened since startup
# TYPE veilchat_streams_opened_total counter
veilchat_streams_opened_total {streams}

# HELP veilchat_encryption_mode Current encryption mode (1 for the active one)
# TYPE veilchat_encryption_mode gauge
"#,
        version = env!("CARGO_PKG_VERSION"),
    );

    for mode in EncryptionMode::ALL {
        let active = u8::from(current == Some(mode));
        // Writing to a String cannot fail
        let _ = writeln!(body, "veilchat_encryption_mode{{mode=\"{mode}\"}} {active}");
    }

    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteModeStore;

    #[tokio::test]
    async fn render_marks_current_mode() {
        let store = SqliteModeStore::in_memory().await.unwrap();
        let service = EncryptionService::new(Arc::new(store));
        service.set_mode("weak_xor").await.unwrap();
        service.encrypt("hi").await.unwrap();

        let body = render(&service, Some(EncryptionMode::WeakXor));
        assert!(body.contains("veilchat_mode_changes_total 1"));
        assert!(body.contains("veilchat_encrypt_total 1"));
        assert!(body.contains("veilchat_encryption_mode{mode=\"weak_xor\"} 1"));
        assert!(body.contains("veilchat_encryption_mode{mode=\"plaintext\"} 0"));
    }

    #[tokio::test]
    async fn render_without_readable_mode_marks_none() {
        let store = SqliteModeStore::in_memory().await.unwrap();
        let service = EncryptionService::new(Arc::new(store));

        let body = render(&service, None);
        for mode in EncryptionMode::ALL {
            assert!(body.contains(&format!("veilchat_encryption_mode{{mode=\"{mode}\"}} 0")));
        }
    }
}
