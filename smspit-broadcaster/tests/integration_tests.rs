use smspit_broadcaster::{MessageBroadcaster, NotifyReport};
use smspit_store::Message;
use std::sync::Arc;
use std::time::Duration;

fn message(id: &str, body: &str) -> Message {
    Message::captured(id, "+15551234567", "", body, Vec::new(), chrono::Utc::now())
}

fn message_id(frame: &str) -> String {
    let value: serde_json::Value = serde_json::from_str(frame).unwrap();
    assert_eq!(value["type"], "new_message");
    value["message"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_broadcast_to_multiple_subscribers() {
    let broadcaster = MessageBroadcaster::new(16);
    let mut sub1 = broadcaster.subscribe().await.unwrap();
    let mut sub2 = broadcaster.subscribe().await.unwrap();

    let report = broadcaster.notify(&message("msg_1", "Broadcast test")).await;
    assert_eq!(report, NotifyReport { delivered: 2, dropped: 0 });

    let frame1 = sub1.recv().await.unwrap();
    let frame2 = sub2.recv().await.unwrap();
    assert_eq!(message_id(&frame1), "msg_1");
    assert_eq!(frame1, frame2);
}

#[tokio::test]
async fn test_events_arrive_in_notify_order() {
    let broadcaster = MessageBroadcaster::new(16);
    let mut sub = broadcaster.subscribe().await.unwrap();

    for i in 0..5 {
        broadcaster
            .notify(&message(&format!("msg_{}", i), "ordered"))
            .await;
    }

    for i in 0..5 {
        let frame = sub.recv().await.unwrap();
        assert_eq!(message_id(&frame), format!("msg_{}", i));
    }
}

#[tokio::test]
async fn test_disconnected_subscriber_is_pruned() {
    let broadcaster = MessageBroadcaster::new(16);
    let gone = broadcaster.subscribe().await.unwrap();
    let gone_id = gone.id();
    let mut alive = broadcaster.subscribe().await.unwrap();

    // Connection task ended without unsubscribing
    drop(gone);

    let report = broadcaster.notify(&message("msg_1", "after drop")).await;
    assert_eq!(report, NotifyReport { delivered: 1, dropped: 1 });
    assert!(!broadcaster.is_subscribed(gone_id).await);
    assert_eq!(broadcaster.subscriber_count().await, 1);

    assert_eq!(message_id(&alive.recv().await.unwrap()), "msg_1");
}

#[tokio::test]
async fn test_unsubscribed_before_notify_receives_nothing() {
    let broadcaster = MessageBroadcaster::new(16);
    let mut sub = broadcaster.subscribe().await.unwrap();
    assert!(broadcaster.close(&mut sub).await);

    let report = broadcaster.notify(&message("msg_1", "late")).await;
    assert_eq!(report.delivered, 0);
    assert!(sub.recv().await.is_none());
    assert!(!broadcaster.is_subscribed(sub.id()).await);
}

#[tokio::test]
async fn test_slow_subscriber_does_not_block_others() {
    let broadcaster = MessageBroadcaster::new(2);
    let _slow = broadcaster.subscribe().await.unwrap();
    let mut fast = broadcaster.subscribe().await.unwrap();

    for i in 0..10 {
        let captured = message(&format!("msg_{}", i), "burst");
        tokio::time::timeout(Duration::from_millis(500), broadcaster.notify(&captured))
            .await
            .expect("notify must not wait on a stalled subscriber");
        // Keep the fast subscriber drained
        assert_eq!(message_id(&fast.recv().await.unwrap()), format!("msg_{}", i));
    }

    assert_eq!(broadcaster.subscriber_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_close_and_prune_remove_once() {
    let broadcaster = Arc::new(MessageBroadcaster::new(1));

    for round in 0..50 {
        let mut sub = broadcaster.subscribe().await.unwrap();
        // Fill the queue so the next notify prunes it
        broadcaster
            .notify(&message(&format!("fill_{}", round), "x"))
            .await;

        let b1 = Arc::clone(&broadcaster);
        let prune = tokio::spawn(async move {
            b1.notify(&message(&format!("race_{}", round), "x"))
                .await
                .dropped
        });
        let closed_here = broadcaster.close(&mut sub).await;
        let pruned = prune.await.unwrap();

        // Exactly one side removed it
        assert_eq!(closed_here as usize + pruned, 1);
        assert_eq!(broadcaster.subscriber_count().await, 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_subscribe_racing_close_all_never_outlives_it() {
    for _ in 0..20 {
        let broadcaster = Arc::new(MessageBroadcaster::new(4));

        let mut joins = Vec::new();
        for _ in 0..16 {
            let b = Arc::clone(&broadcaster);
            joins.push(tokio::spawn(async move { b.subscribe().await.ok() }));
        }
        broadcaster.close_all().await;

        for join in joins {
            // Either refused, or registered before close_all and released by it
            if let Some(mut sub) = join.await.unwrap() {
                let ended = tokio::time::timeout(Duration::from_secs(1), sub.recv())
                    .await
                    .expect("subscription queue stayed open after close_all");
                assert!(ended.is_none());
            }
        }
        assert_eq!(broadcaster.subscriber_count().await, 0);
    }
}

