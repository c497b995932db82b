//! Encryption service coordination.
//!
//! [`EncryptionService`] owns the strategy registry and the change notifier,
//! reads and writes the current mode through a [`ModeStore`], and exposes
//! the operations the rest of the application uses: status, mode changes,
//! encrypt/decrypt and the live change stream.

use crate::error::Result;
use crate::notifier::{ModeNotifier, SubscriberId, Subscription};
use crate::storage::{ModeRecord, ModeStore};
use futures_util::Stream;
use serde::Serialize;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::Mutex;
use veil_core::StrategyRegistry;
use veil_types::{EncryptionMode, StatusSnapshot};

/// Operational metrics for monitoring service activity.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct ServiceMetrics {
    /// Mode changes that altered the stored mode.
    pub mode_changes_total: AtomicU64,
    /// Mode change requests that matched the current mode.
    pub mode_change_noops_total: AtomicU64,
    /// Messages encrypted.
    pub encrypt_total: AtomicU64,
    /// Messages decrypted successfully.
    pub decrypt_total: AtomicU64,
    /// Decrypt calls rejected (unknown mode or malformed ciphertext).
    pub decrypt_failures_total: AtomicU64,
    /// Change streams opened.
    pub streams_opened_total: AtomicU64,
}

/// Result of a mode change request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeChange {
    /// Status after the request.
    pub status: StatusSnapshot,
    /// Whether the stored mode changed.
    pub changed: bool,
}

/// A message body transformed under some mode.
///
/// `mode` must be stored alongside `ciphertext`; decrypting later uses it,
/// not whatever mode is current by then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncryptedText {
    /// Transformed body.
    pub ciphertext: String,
    /// Mode whose strategy produced `ciphertext`.
    pub mode: EncryptionMode,
}

/// Encryption-mode service.
pub struct EncryptionService {
    store: Arc<dyn ModeStore>,
    registry: StrategyRegistry,
    notifier: ModeNotifier,
    /// Held across "write mode + publish" and "snapshot + subscribe" so
    /// events go out in commit order and a new stream neither misses nor
    /// repeats a change.
    change_lock: Mutex<()>,
    metrics: ServiceMetrics,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService")
            .field("registry", &self.registry)
            .field("subscribers", &self.notifier.subscriber_count())
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl EncryptionService {
    /// Create a service over the given mode store.
    pub fn new(store: Arc<dyn ModeStore>) -> Self {
        Self {
            store,
            registry: StrategyRegistry::new(),
            notifier: ModeNotifier::new(),
            change_lock: Mutex::new(()),
            metrics: ServiceMetrics::default(),
        }
    }

    /// Get access to the strategy registry.
    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Get access to the change notifier.
    pub fn notifier(&self) -> &ModeNotifier {
        &self.notifier
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &ServiceMetrics {
        &self.metrics
    }

    /// Current mode.
    pub async fn get_mode(&self) -> Result<EncryptionMode> {
        Ok(self.store.get_mode().await?.mode)
    }

    /// Read-only status snapshot for display.
    pub async fn get_status(&self) -> Result<StatusSnapshot> {
        let record = self.store.get_mode().await?;
        Ok(self.snapshot(record))
    }

    /// Change the current mode.
    ///
    /// Publishes one event to every subscriber if, and only if, the mode
    /// actually changed. Privilege checks are the caller's job.
    ///
    /// # Errors
    ///
    /// `UnsupportedMode` for an unknown id, before anything is written.
    pub async fn set_mode(&self, mode_id: &str) -> Result<ModeChange> {
        let mode = EncryptionMode::parse_supported(mode_id).inspect_err(|e| {
            tracing::warn!("Rejected mode change: {}", e);
        })?;

        let _guard = self.change_lock.lock().await;
        let (record, changed) = self.store.set_mode(mode).await?;
        let status = self.snapshot(record);

        if changed {
            self.metrics.mode_changes_total.fetch_add(1, Ordering::Relaxed);
            let delivered = self.notifier.publish(&status);
            tracing::info!(
                "Encryption mode changed to {} ({} subscribers notified)",
                status.mode,
                delivered
            );
        } else {
            self.metrics
                .mode_change_noops_total
                .fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Encryption mode already {}", status.mode);
        }

        Ok(ModeChange { status, changed })
    }

    /// Encrypt a message body under the current mode.
    ///
    /// Modes without their own strategy encrypt as plaintext, and the
    /// result records `plaintext` as its mode.
    pub async fn encrypt(&self, plaintext: &str) -> Result<EncryptedText> {
        let current = self.get_mode().await?;
        let strategy = self.registry.strategy_for(current);
        self.metrics.encrypt_total.fetch_add(1, Ordering::Relaxed);

        Ok(EncryptedText {
            ciphertext: strategy.encrypt(plaintext),
            mode: strategy.id(),
        })
    }

    /// Decrypt a message body with the mode it was stored under.
    ///
    /// # Errors
    ///
    /// `UnknownMode` for an unknown `mode_id`, `InvalidCiphertext` when the
    /// body is not valid for that mode.
    pub fn decrypt(&self, ciphertext: &str, mode_id: &str) -> Result<String> {
        let result = self
            .registry
            .get_strategy(mode_id)
            .and_then(|strategy| strategy.decrypt(ciphertext));

        match result {
            Ok(plaintext) => {
                self.metrics.decrypt_total.fetch_add(1, Ordering::Relaxed);
                Ok(plaintext)
            }
            Err(e) => {
                self.metrics
                    .decrypt_failures_total
                    .fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Decrypt rejected: {}", e);
                Err(e.into())
            }
        }
    }

    /// Open a live status stream.
    ///
    /// The first item is the current status; each later item is a change
    /// published after the stream opened. Dropping the stream unsubscribes.
    pub async fn open_change_stream(&self) -> Result<ChangeStream> {
        let _guard = self.change_lock.lock().await;
        let initial = self.get_status().await?;
        let subscription = self.notifier.subscribe();

        self.metrics
            .streams_opened_total
            .fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            "Opened change stream {} at mode {}",
            subscription.id(),
            initial.mode
        );

        Ok(ChangeStream {
            initial: Some(initial),
            subscription,
        })
    }

    /// Close every open change stream and refuse new subscriptions.
    pub fn shutdown(&self) {
        self.notifier.shutdown();
    }

    fn snapshot(&self, record: ModeRecord) -> StatusSnapshot {
        StatusSnapshot::new(record.mode, record.updated_at, self.registry.list_modes())
    }
}

/// Live sequence of status snapshots.
///
/// Yields the baseline first, then every published change. It ends only
/// when the service shuts down.
#[derive(Debug)]
pub struct ChangeStream {
    initial: Option<StatusSnapshot>,
    subscription: Subscription,
}

impl ChangeStream {
    /// Identifier of the underlying subscription.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.subscription.id()
    }
}

impl Stream for ChangeStream {
    type Item = StatusSnapshot;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Some(initial) = this.initial.take() {
            return Poll::Ready(Some(initial));
        }
        Pin::new(&mut this.subscription).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;
    use crate::storage::SqliteModeStore;
    use futures_util::StreamExt;
    use std::time::Duration;
    use veil_types::ModeError;

    async fn test_service() -> Arc<EncryptionService> {
        let store = SqliteModeStore::in_memory().await.unwrap();
        Arc::new(EncryptionService::new(Arc::new(store)))
    }

    async fn next_within(stream: &mut ChangeStream, ms: u64) -> Option<StatusSnapshot> {
        tokio::time::timeout(Duration::from_millis(ms), stream.next())
            .await
            .ok()
            .flatten()
    }

    #[tokio::test]
    async fn status_starts_as_plaintext() {
        let service = test_service().await;
        let status = service.get_status().await.unwrap();

        assert_eq!(status.mode, EncryptionMode::Plaintext);
        assert_eq!(status.label, "Plain Text");
        assert_eq!(status.available_modes, service.registry().list_modes());
    }

    #[tokio::test]
    async fn set_mode_publishes_once() {
        let service = test_service().await;
        let mut sub = service.notifier().subscribe();

        let change = service.set_mode("weak_xor").await.unwrap();
        assert!(change.changed);
        assert_eq!(change.status.mode, EncryptionMode::WeakXor);
        assert_eq!(change.status.label, "Weak XOR Cipher");

        assert_eq!(sub.try_recv().unwrap(), change.status);
        assert!(sub.try_recv().is_none());
        assert_eq!(service.metrics().mode_changes_total.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn setting_current_mode_publishes_nothing() {
        let service = test_service().await;
        let mut sub = service.notifier().subscribe();

        let change = service.set_mode("plaintext").await.unwrap();
        assert!(!change.changed);
        assert!(sub.try_recv().is_none());

        service.set_mode("weak_xor").await.unwrap();
        sub.try_recv().unwrap();

        let change = service.set_mode("weak_xor").await.unwrap();
        assert!(!change.changed);
        assert!(sub.try_recv().is_none());
        assert_eq!(
            service.metrics().mode_change_noops_total.load(Ordering::Relaxed),
            2
        );
    }

    #[tokio::test]
    async fn unknown_mode_is_rejected_without_mutation() {
        let service = test_service().await;
        service.set_mode("weak_xor").await.unwrap();
        let before = service.get_status().await.unwrap();
        let mut sub = service.notifier().subscribe();

        let err = service.set_mode("rot13").await.unwrap_err();
        assert!(matches!(
            err,
            ServerError::Mode(ModeError::UnsupportedMode(ref id)) if id == "rot13"
        ));

        assert_eq!(service.get_status().await.unwrap(), before);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_setters_publish_exactly_one_event_per_change() {
        let service = test_service().await;
        let mut sub = service.notifier().subscribe();

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let service = service.clone();
                let mode = EncryptionMode::ALL[i % EncryptionMode::ALL.len()];
                tokio::spawn(async move { service.set_mode(mode.as_str()).await.unwrap() })
            })
            .collect();

        let mut changes = 0;
        for handle in handles {
            if handle.await.unwrap().changed {
                changes += 1;
            }
        }

        let mut events = Vec::new();
        while let Some(event) = sub.try_recv() {
            events.push(event);
        }

        assert!(changes > 0);
        assert_eq!(events.len(), changes);
        // Every event is an actual change from the one before it
        for pair in events.windows(2) {
            assert_ne!(pair[0].mode, pair[1].mode);
        }
        assert_eq!(
            events.last().unwrap().mode,
            service.get_mode().await.unwrap()
        );
    }

    #[tokio::test]
    async fn stream_emits_baseline_then_changes() {
        let service = test_service().await;
        let before = service.notifier().subscriber_count();

        let mut stream = service.open_change_stream().await.unwrap();
        let first = next_within(&mut stream, 500).await.unwrap();
        assert_eq!(first.mode, EncryptionMode::Plaintext);
        assert_eq!(service.notifier().subscriber_count(), before + 1);

        service.set_mode("weak_xor").await.unwrap();
        let second = next_within(&mut stream, 500).await.unwrap();
        assert_eq!(second.mode, EncryptionMode::WeakXor);
        assert!(next_within(&mut stream, 50).await.is_none());

        drop(stream);
        assert_eq!(service.notifier().subscriber_count(), before);
    }

    #[tokio::test]
    async fn stream_baseline_reflects_current_mode() {
        let service = test_service().await;
        service.set_mode("weak_xor_b64").await.unwrap();

        let mut stream = service.open_change_stream().await.unwrap();
        let first = next_within(&mut stream, 500).await.unwrap();
        assert_eq!(first.mode, EncryptionMode::WeakXorBase64);
        assert!(next_within(&mut stream, 50).await.is_none());
    }

    #[tokio::test]
    async fn shutdown_ends_open_streams() {
        let service = test_service().await;
        let mut stream = service.open_change_stream().await.unwrap();
        next_within(&mut stream, 500).await.unwrap();

        service.shutdown();
        let ended = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("stream should end promptly");
        assert!(ended.is_none());
    }

    #[tokio::test]
    async fn encrypt_uses_current_mode() {
        let service = test_service().await;

        let plain = service.encrypt("hello").await.unwrap();
        assert_eq!(plain.ciphertext, "hello");
        assert_eq!(plain.mode, EncryptionMode::Plaintext);

        service.set_mode("weak_xor").await.unwrap();
        let xored = service.encrypt("hello").await.unwrap();
        assert_eq!(xored.ciphertext, "1f000d0742");
        assert_eq!(xored.mode, EncryptionMode::WeakXor);
    }

    #[tokio::test]
    async fn reserved_mode_encrypts_as_plaintext() {
        let service = test_service().await;
        let change = service.set_mode("end_to_end").await.unwrap();
        assert!(change.changed);
        assert_eq!(change.status.label, "End-to-End Encrypted");

        let out = service.encrypt("hello").await.unwrap();
        assert_eq!(out.ciphertext, "hello");
        assert_eq!(out.mode, EncryptionMode::Plaintext);
    }

    #[tokio::test]
    async fn old_messages_decrypt_after_mode_change() {
        let service = test_service().await;
        service.set_mode("weak_xor").await.unwrap();
        let stored = service.encrypt("kept under the old mode").await.unwrap();

        service.set_mode("weak_xor_b64").await.unwrap();
        let plaintext = service
            .decrypt(&stored.ciphertext, stored.mode.as_str())
            .unwrap();
        assert_eq!(plaintext, "kept under the old mode");
    }

    #[tokio::test]
    async fn decrypt_errors_are_typed() {
        let service = test_service().await;

        let err = service.decrypt("1f000d074", "weak_xor").unwrap_err();
        assert!(matches!(
            err,
            ServerError::Mode(ModeError::InvalidCiphertext { .. })
        ));

        let err = service.decrypt("hello", "caesar").unwrap_err();
        assert!(matches!(err, ServerError::Mode(ModeError::UnknownMode(_))));

        assert_eq!(
            service.metrics().decrypt_failures_total.load(Ordering::Relaxed),
            2
        );
    }

    #[test]
    fn service_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EncryptionService>();
        assert_send_sync::<ChangeStream>();
    }
}
