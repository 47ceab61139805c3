use std::sync::Arc;

use smspit_store::Message;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::client::{NotifyReport, SubscriberId, SubscriberRegistry, Subscription};
use crate::error::{BroadcasterError, Result};
use crate::events::BroadcastEvent;

/// Sending half of an ordered fan-out feed
///
/// Messages sent here are notified one at a time, in send order.
pub type FeedSender = mpsc::UnboundedSender<Message>;

/// Real-time fan-out of captured messages
pub struct MessageBroadcaster {
    registry: SubscriberRegistry,
}

impl MessageBroadcaster {
    /// Create a broadcaster whose subscribers may lag by up to `queue_capacity` events
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            registry: SubscriberRegistry::new(queue_capacity),
        }
    }

    /// Register a live subscriber
    pub async fn subscribe(&self) -> Result<Subscription> {
        self.registry.add().await.ok_or(BroadcasterError::ShutDown)
    }

    /// Remove a subscriber by id; safe to call more than once
    pub async fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.registry.remove(id).await
    }

    /// Finish a subscription: unregister it and mark it closed
    ///
    /// Returns whether this call was the one that removed it from the registry.
    pub async fn close(&self, subscription: &mut Subscription) -> bool {
        subscription.mark_closing();
        let removed = self.registry.remove(subscription.id()).await;
        subscription.mark_closed();
        removed
    }

    /// Push a `new_message` event to every current subscriber
    pub async fn notify(&self, message: &Message) -> NotifyReport {
        match self.broadcast_event(&BroadcastEvent::new_message(message)).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("Failed to broadcast new_message {}: {}", message.id, e);
                NotifyReport::default()
            }
        }
    }

    /// Serialize `event` once and offer it to every subscriber
    pub async fn broadcast_event(&self, event: &BroadcastEvent) -> Result<NotifyReport> {
        let payload: Arc<str> = Arc::from(event.to_json()?);
        Ok(self.registry.broadcast(payload).await)
    }

    /// Get current subscriber count
    pub async fn subscriber_count(&self) -> usize {
        self.registry.count().await
    }

    pub async fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.registry.contains(id).await
    }

    /// Drop every subscriber and refuse new ones
    pub async fn close_all(&self) {
        let count = self.registry.close().await;
        tracing::info!("Broadcaster closed, {} subscribers released", count);
    }

    /// Start a task that notifies every message sent on the returned feed
    ///
    /// One task drains the feed, so events go out in exactly the order they
    /// were sent. The task ends when every sender has been dropped. Must be
    /// called from within a tokio runtime.
    pub fn spawn_feed(self: &Arc<Self>) -> (FeedSender, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        let broadcaster = Arc::clone(self);

        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let report = broadcaster.notify(&message).await;
                tracing::debug!(
                    "Broadcast {} to {} subscribers ({} dropped)",
                    message.id,
                    report.delivered,
                    report.dropped
                );
            }
            tracing::debug!("Fan-out feed closed");
        });

        (tx, handle)
    }
}

impl Default for MessageBroadcaster {
    fn default() -> Self {
        Self::new(crate::DEFAULT_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(id: &str) -> Message {
        Message::captured(id, "+15551234567", "", "hello", Vec::new(), Utc::now())
    }

    #[tokio::test]
    async fn test_broadcaster_create() {
        let broadcaster = MessageBroadcaster::new(8);
        assert_eq!(broadcaster.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_notify_without_subscribers() {
        let broadcaster = MessageBroadcaster::new(8);
        let report = broadcaster.notify(&message("msg_1")).await;
        assert_eq!(report, NotifyReport::default());
    }

    #[tokio::test]
    async fn test_close_removes_exactly_once() {
        let broadcaster = MessageBroadcaster::new(8);
        let mut sub = broadcaster.subscribe().await.unwrap();
        let id = sub.id();

        assert!(broadcaster.close(&mut sub).await);
        assert!(!broadcaster.unsubscribe(id).await);
        assert!(!broadcaster.close(&mut sub).await);
        assert_eq!(broadcaster.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_subscribe_after_close_all_fails() {
        let broadcaster = MessageBroadcaster::new(8);
        let _sub = broadcaster.subscribe().await.unwrap();

        broadcaster.close_all().await;
        assert_eq!(broadcaster.subscriber_count().await, 0);
        assert!(matches!(
            broadcaster.subscribe().await,
            Err(BroadcasterError::ShutDown)
        ));
    }

    #[tokio::test]
    async fn test_feed_preserves_send_order() {
        let broadcaster = Arc::new(MessageBroadcaster::new(64));
        let mut sub = broadcaster.subscribe().await.unwrap();
        let (feed, handle) = broadcaster.spawn_feed();

        for i in 0..20 {
            feed.send(message(&format!("msg_{}", i))).unwrap();
        }
        drop(feed);
        handle.await.unwrap();

        for i in 0..20 {
            let frame = sub.recv().await.unwrap();
            let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
            assert_eq!(value["message"]["id"], format!("msg_{}", i));
        }
    }
}
