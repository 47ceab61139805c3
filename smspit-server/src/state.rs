use std::sync::Arc;

use smspit_broadcaster::MessageBroadcaster;
use smspit_store::MessageStore;

use crate::capture::CapturePipeline;
use crate::config::ServerConfig;

/// Shared server state handed to every handler
///
/// The store and the broadcaster each carry their own lock; nothing here
/// holds both at once. Building it starts the capture fan-out task, so it
/// needs a tokio runtime.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub store: Arc<MessageStore>,
    pub broadcaster: Arc<MessageBroadcaster>,
    pub pipeline: Arc<CapturePipeline>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(MessageStore::new(config.max_messages));
        let broadcaster = Arc::new(MessageBroadcaster::new(config.subscriber_queue));
        let pipeline = Arc::new(CapturePipeline::new(Arc::clone(&store), &broadcaster));

        Self {
            config: Arc::new(config),
            store,
            broadcaster,
            pipeline,
        }
    }
}
