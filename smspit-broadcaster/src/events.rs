use serde::{Deserialize, Serialize};
use smspit_store::Message;

/// Event types pushed to live subscribers
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum BroadcastEvent {
    /// A message was just captured
    #[serde(rename = "new_message")]
    NewMessage { message: Message },
}

impl BroadcastEvent {
    pub fn new_message(message: &Message) -> Self {
        BroadcastEvent::NewMessage {
            message: message.clone(),
        }
    }

    /// Serialize to a single JSON text frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
