use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;

/// Identifies one registered subscriber
pub type SubscriberId = u64;

/// Serialized event payload shared by every subscriber queue
pub type Payload = Arc<str>;

/// Lifecycle of a subscriber connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Receiving side of a registration, owned by the connection task
///
/// Dropping it closes the queue, so the next fan-out prunes the registry
/// entry even if the connection never unsubscribed explicitly.
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Payload>,
    state: SubscriberState,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn state(&self) -> SubscriberState {
        self.state
    }

    /// Next queued event; `None` once unregistered and drained
    pub async fn recv(&mut self) -> Option<Payload> {
        self.rx.recv().await
    }

    pub fn mark_open(&mut self) {
        if self.state == SubscriberState::Connecting {
            self.state = SubscriberState::Open;
        }
    }

    pub fn mark_closing(&mut self) {
        if matches!(
            self.state,
            SubscriberState::Connecting | SubscriberState::Open
        ) {
            self.state = SubscriberState::Closing;
        }
    }

    pub(crate) fn mark_closed(&mut self) {
        self.state = SubscriberState::Closed;
        self.rx.close();
    }
}

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    pub delivered: usize,
    pub dropped: usize,
}

struct RegistryInner {
    subscribers: HashMap<SubscriberId, mpsc::Sender<Payload>>,
    /// Set by `close`; refuses later registrations
    closed: bool,
}

/// Thread-safe subscriber set
pub struct SubscriberRegistry {
    inner: Mutex<RegistryInner>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl SubscriberRegistry {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                subscribers: HashMap::new(),
                closed: false,
            }),
            next_id: AtomicU64::new(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register a new subscriber; `None` once the registry is closed
    pub async fn add(&self) -> Option<Subscription> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        inner.subscribers.insert(id, tx);
        tracing::info!(
            "New subscriber {} connected. Total subscribers: {}",
            id,
            inner.subscribers.len()
        );

        Some(Subscription {
            id,
            rx,
            state: SubscriberState::Connecting,
        })
    }

    /// Remove a subscriber; only the first call for an id returns true
    pub async fn remove(&self, id: SubscriberId) -> bool {
        let mut inner = self.inner.lock().await;
        let removed = inner.subscribers.remove(&id).is_some();
        if removed {
            tracing::info!(
                "Subscriber {} removed. Remaining: {}",
                id,
                inner.subscribers.len()
            );
        }
        removed
    }

    /// Offer `payload` to every subscriber, removing the ones that cannot take it
    ///
    /// Never waits on a subscriber: a closed queue means the connection is
    /// gone, a full one means it stopped draining. Both are dropped.
    pub async fn broadcast(&self, payload: Payload) -> NotifyReport {
        let mut inner = self.inner.lock().await;
        let subscribers = &mut inner.subscribers;
        let mut report = NotifyReport::default();
        let mut dead = Vec::new();

        for (id, tx) in subscribers.iter() {
            match tx.try_send(Arc::clone(&payload)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!("Subscriber {} queue full, dropping subscriber", id);
                    dead.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!("Subscriber {} connection gone", id);
                    dead.push(*id);
                }
            }
        }

        for id in dead {
            subscribers.remove(&id);
            report.dropped += 1;
            tracing::info!(
                "Removed dead subscriber {}. Remaining: {}",
                id,
                subscribers.len()
            );
        }

        report
    }

    /// Unregister everyone and refuse new subscribers; returns how many were removed
    ///
    /// Dropping the senders ends every subscription queue once drained.
    pub async fn close(&self) -> usize {
        let mut inner = self.inner.lock().await;
        inner.closed = true;
        let count = inner.subscribers.len();
        inner.subscribers.clear();
        count
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }

    pub async fn count(&self) -> usize {
        self.inner.lock().await.subscribers.len()
    }

    pub async fn contains(&self, id: SubscriberId) -> bool {
        self.inner.lock().await.subscribers.contains_key(&id)
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new(crate::DEFAULT_QUEUE_CAPACITY)
    }
}
