//! In-process publish/subscribe hub for mode changes.
//!
//! Every subscriber gets a private unbounded queue, so publishing never
//! waits on a slow consumer. The subscriber set sits behind one mutex:
//! subscribe, unsubscribe and publish each take it for the whole
//! operation, so a publish sees the set as it was at one instant.
//!
//! A [`Subscription`] unregisters itself when dropped. Whatever ends a
//! stream (normal close, error, client disconnect, task cancellation) drops
//! the subscription and releases its slot.

use futures_util::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use veil_types::StatusSnapshot;

/// Identifier of one subscription, unique for the notifier's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Registry {
    subscribers: HashMap<SubscriberId, UnboundedSender<StatusSnapshot>>,
    next_id: u64,
    closed: bool,
}

/// Fan-out hub for [`StatusSnapshot`] events.
///
/// Cloning is cheap and yields a handle to the same hub.
#[derive(Debug, Clone, Default)]
pub struct ModeNotifier {
    registry: Arc<Mutex<Registry>>,
}

impl ModeNotifier {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    ///
    /// It receives every event published from now until it is dropped or
    /// passed to [`unsubscribe`](Self::unsubscribe). After
    /// [`shutdown`](Self::shutdown) the returned subscription is already
    /// closed.
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut registry = lock(&self.registry);

        let id = SubscriberId(registry.next_id);
        registry.next_id += 1;

        if registry.closed {
            drop(sender);
        } else {
            registry.subscribers.insert(id, sender);
        }
        tracing::debug!(
            "Subscribed {} (total: {})",
            id,
            registry.subscribers.len()
        );

        Subscription {
            id,
            receiver,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Remove a subscriber. Undelivered events are discarded.
    pub fn unsubscribe(&self, subscription: Subscription) {
        drop(subscription);
    }

    /// Deliver a copy of `event` to every registered subscriber.
    ///
    /// Returns how many subscribers it was delivered to.
    pub fn publish(&self, event: &StatusSnapshot) -> usize {
        let mut registry = lock(&self.registry);
        let before = registry.subscribers.len();

        registry
            .subscribers
            .retain(|_, sender| sender.send(event.clone()).is_ok());

        let delivered = registry.subscribers.len();
        tracing::debug!(
            "Published {} to {}/{} subscribers",
            event.mode,
            delivered,
            before
        );
        delivered
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).subscribers.len()
    }

    /// Close every subscription and refuse new ones.
    ///
    /// Streams waiting on a subscription see the end of their queue after
    /// draining what was already delivered.
    pub fn shutdown(&self) {
        let mut registry = lock(&self.registry);
        registry.closed = true;
        let dropped = registry.subscribers.len();
        registry.subscribers.clear();
        tracing::info!("Notifier shut down, closed {} subscriptions", dropped);
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        lock(&self.registry).closed
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    // Critical sections never panic midway, so a poisoned set is still consistent
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Receiving side of one subscription.
///
/// Yields events in publish order. Dropping it unregisters from the hub.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: UnboundedReceiver<StatusSnapshot>,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// This subscription's identifier.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the hub has shut down and the queue is drained.
    pub async fn recv(&mut self) -> Option<StatusSnapshot> {
        self.receiver.recv().await
    }

    /// Take the next already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<StatusSnapshot> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = StatusSnapshot;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = lock(&registry);
            if registry.subscribers.remove(&self.id).is_some() {
                tracing::debug!(
                    "Unsubscribed {} (remaining: {})",
                    self.id,
                    registry.subscribers.len()
                );
            }
        }
    }
}
