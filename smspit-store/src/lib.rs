//! In-memory message store for SMSpit
//!
//! Captured SMS messages live here for the lifetime of the process. The store
//! is newest-first and bounded: once `max_messages` is exceeded the oldest
//! entries are evicted on the same write that inserted the new one.
//!
//! # Example Usage
//!
//! ```no_run
//! use chrono::Utc;
//! use smspit_store::{Message, MessageStore, SearchQuery};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MessageStore::new(10_000);
//!
//!     let message = Message::captured(
//!         "msg_1a2b3c4d",
//!         "+15551234567",
//!         "",
//!         "Your code is 123456",
//!         Vec::new(),
//!         Utc::now(),
//!     );
//!     store.append(message).await?;
//!
//!     let hits = store.search(&SearchQuery::text("code")).await;
//!     assert_eq!(hits.len(), 1);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod models;
pub mod store;

// Re-exports
pub use error::{Result, StoreError};
pub use models::{Message, SearchQuery, StoreStats, STATUS_CAPTURED};
pub use store::MessageStore;
