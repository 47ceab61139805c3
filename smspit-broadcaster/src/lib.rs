//! Real-time message broadcaster for SMSpit
//!
//! Keeps the set of live subscribers (WebSocket sessions in the server) and
//! pushes every captured message to all of them. Each subscriber owns a
//! bounded queue; fan-out never waits on a subscriber, and one that is gone or
//! not keeping up is unregistered without affecting the others.
//!
//! # Event Types
//!
//! - `new_message` - a message was captured; carries the full message
//!
//! # Example Usage
//!
//! ```no_run
//! use smspit_broadcaster::MessageBroadcaster;
//! use smspit_store::Message;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broadcaster = MessageBroadcaster::new(256);
//!
//!     let mut subscription = broadcaster.subscribe().await?;
//!     subscription.mark_open();
//!
//!     let message = Message::captured(
//!         "msg_1",
//!         "+15551234567",
//!         "",
//!         "hi",
//!         vec![],
//!         chrono::Utc::now(),
//!     );
//!     broadcaster.notify(&message).await;
//!
//!     if let Some(frame) = subscription.recv().await {
//!         println!("{}", frame);
//!     }
//!
//!     broadcaster.close(&mut subscription).await;
//!     Ok(())
//! }
//! ```

pub mod broadcaster;
pub mod client;
pub mod error;
pub mod events;

/// Per-subscriber queue length used by `Default`
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

// Re-exports
pub use broadcaster::{FeedSender, MessageBroadcaster};
pub use client::{NotifyReport, Payload, SubscriberId, SubscriberState, Subscription};
pub use error::{BroadcasterError, Result};
pub use events::BroadcastEvent;
