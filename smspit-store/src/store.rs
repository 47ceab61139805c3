use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::models::{Message, SearchQuery, StoreStats};

struct StoreInner {
    /// Newest first
    messages: VecDeque<Message>,
    ids: HashSet<String>,
}

/// Bounded, newest-first message store
///
/// Every mutation takes the write lock and completes before releasing it, so
/// readers never see a half-applied insert or eviction. Reads return owned
/// snapshots.
pub struct MessageStore {
    inner: RwLock<StoreInner>,
    max_messages: usize,
}

impl MessageStore {
    /// Create a store holding at most `max_messages` (minimum 1)
    pub fn new(max_messages: usize) -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                messages: VecDeque::new(),
                ids: HashSet::new(),
            }),
            max_messages: max_messages.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.max_messages
    }

    /// Insert at the front, evicting from the back past capacity
    ///
    /// The stored timestamp is raised to the newest stored timestamp if it is
    /// older, keeping `created_at` non-decreasing in insertion order. Returns
    /// the message as stored.
    pub async fn append(&self, message: Message) -> Result<Message> {
        self.append_with(message, |_| {}).await
    }

    /// Like [`append`](Self::append), calling `on_stored` before the write
    /// lock is released
    ///
    /// Successive `on_stored` calls therefore happen in store order. The hook
    /// runs under the lock and must not block or await.
    pub async fn append_with<F>(&self, mut message: Message, on_stored: F) -> Result<Message>
    where
        F: FnOnce(&Message),
    {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        if inner.ids.contains(&message.id) {
            return Err(StoreError::DuplicateId(message.id));
        }

        if let Some(newest) = inner.messages.front() {
            if message.created_at < newest.created_at {
                message.created_at = newest.created_at;
            }
        }

        inner.ids.insert(message.id.clone());
        inner.messages.push_front(message.clone());

        while inner.messages.len() > self.max_messages {
            if let Some(evicted) = inner.messages.pop_back() {
                inner.ids.remove(&evicted.id);
                tracing::trace!("Evicted message {}", evicted.id);
            }
        }

        on_stored(&message);
        Ok(message)
    }

    /// Snapshot of all messages, newest first
    pub async fn list(&self) -> Vec<Message> {
        self.inner.read().await.messages.iter().cloned().collect()
    }

    pub async fn find(&self, id: &str) -> Option<Message> {
        let inner = self.inner.read().await;
        if !inner.ids.contains(id) {
            return None;
        }
        inner.messages.iter().find(|m| m.id == id).cloned()
    }

    /// Remove everything; returns how many messages were dropped
    pub async fn delete_all(&self) -> usize {
        let mut inner = self.inner.write().await;
        let removed = inner.messages.len();
        inner.messages.clear();
        inner.ids.clear();
        removed
    }

    /// Remove the message with `id`; false if it was not stored
    pub async fn delete_one(&self, id: &str) -> bool {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        if !inner.ids.remove(id) {
            return false;
        }
        if let Some(pos) = inner.messages.iter().position(|m| m.id == id) {
            inner.messages.remove(pos);
        }
        true
    }

    /// Messages matching `query`, in store order
    pub async fn search(&self, query: &SearchQuery) -> Vec<Message> {
        self.inner
            .read()
            .await
            .messages
            .iter()
            .filter(|m| query.matches(m))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.messages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Aggregate counts relative to `now`
    pub async fn stats(&self, now: DateTime<Utc>) -> StoreStats {
        let inner = self.inner.read().await;
        let day = Duration::hours(24);
        let hour = Duration::hours(1);

        let mut recipients = HashSet::new();
        let mut stats = StoreStats {
            total_messages: inner.messages.len(),
            ..StoreStats::default()
        };

        for message in &inner.messages {
            recipients.insert(message.to.as_str());
            let age = now - message.created_at;
            if age < day {
                stats.messages_last_24h += 1;
            }
            if age < hour {
                stats.messages_last_hour += 1;
            }
        }

        stats.unique_recipients = recipients.len();
        stats
    }
}
