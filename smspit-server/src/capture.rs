//! Capture pipeline
//!
//! Turns inbound send requests (native JSON or Twilio-style form) into stored
//! messages: validate, normalize, append to the store, then fan out to live
//! subscribers. Each stored message is queued on the broadcaster's feed while
//! the store's write lock is still held, so events leave in store order. The
//! feed is a channel, so the registry lock is never taken under the store lock.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use smspit_broadcaster::{FeedSender, MessageBroadcaster};
use smspit_store::{Message, MessageStore, StoreError, STATUS_CAPTURED};

use crate::error::{ApiError, ApiResult};

/// Status reported by the Twilio-compatible response (the stored status stays `captured`)
pub const STATUS_QUEUED: &str = "queued";

/// Fresh ids drawn before giving up on a collision
const MAX_ID_ATTEMPTS: usize = 8;

/// Characters of the body shown in capture logs
const LOG_BODY_CHARS: usize = 50;

/// Native `POST /send` payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendRequest {
    #[serde(default, alias = "To")]
    pub to: Option<String>,
    #[serde(default, alias = "From")]
    pub from: Option<String>,
    #[serde(default, alias = "Body")]
    pub body: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Twilio clients put the text here instead of `body`
    #[serde(default, rename = "Message")]
    pub message: Option<String>,
}

impl SendRequest {
    /// `body`, falling back to `Message` when `body` is empty
    pub fn effective_body(&self) -> &str {
        match self.body.as_deref() {
            Some(body) if !body.is_empty() => body,
            _ => self.message.as_deref().unwrap_or_default(),
        }
    }
}

/// Twilio-style form payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TwilioSendRequest {
    #[serde(rename = "To", default)]
    pub to: String,
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResponse {
    pub id: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioSendResponse {
    pub sid: String,
    pub status: String,
    pub to: String,
    pub from: String,
    pub body: String,
    pub date_created: String,
}

/// Which entry path a capture came through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSource {
    Native,
    Twilio,
}

impl CaptureSource {
    /// `msg_` + 8 hex for native captures, `SM` + 32 hex for Twilio ones
    pub fn new_id(self) -> String {
        let hex = Uuid::new_v4().simple().to_string();
        match self {
            CaptureSource::Native => format!("msg_{}", &hex[..8]),
            CaptureSource::Twilio => format!("SM{}", hex),
        }
    }
}

/// Validated capture, not yet stored
struct Draft {
    to: String,
    from: String,
    body: String,
    tags: Vec<String>,
}

pub struct CapturePipeline {
    store: Arc<MessageStore>,
    feed: FeedSender,
}

impl CapturePipeline {
    /// Wire the pipeline to `store` and start the broadcaster's fan-out feed
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(store: Arc<MessageStore>, broadcaster: &Arc<MessageBroadcaster>) -> Self {
        let (feed, _) = broadcaster.spawn_feed();
        Self { store, feed }
    }

    /// Capture a native request
    pub async fn capture_native(&self, request: SendRequest) -> ApiResult<SendResponse> {
        let body = request.effective_body().to_string();
        let to = request.to.unwrap_or_default();
        require(&to, "to")?;
        require(&body, "body")?;

        let draft = Draft {
            to,
            from: request.from.unwrap_or_default(),
            body,
            tags: request.tags.unwrap_or_default(),
        };
        let message = self.capture(draft, CaptureSource::Native).await?;

        Ok(SendResponse {
            id: message.id,
            status: STATUS_CAPTURED.to_string(),
            timestamp: message.created_at,
        })
    }

    /// Capture a Twilio-compatible request
    pub async fn capture_twilio(
        &self,
        request: TwilioSendRequest,
    ) -> ApiResult<TwilioSendResponse> {
        require(&request.to, "To")?;
        require(&request.body, "Body")?;

        let draft = Draft {
            to: request.to,
            from: request.from,
            body: request.body,
            tags: Vec::new(),
        };
        let message = self.capture(draft, CaptureSource::Twilio).await?;

        Ok(TwilioSendResponse {
            date_created: message
                .created_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            sid: message.id,
            status: STATUS_QUEUED.to_string(),
            to: message.to,
            from: message.from,
            body: message.body,
        })
    }

    async fn capture(&self, draft: Draft, source: CaptureSource) -> ApiResult<Message> {
        let mut message = Message::captured(
            source.new_id(),
            draft.to,
            draft.from,
            draft.body,
            draft.tags,
            Utc::now(),
        );

        for _ in 0..MAX_ID_ATTEMPTS {
            let appended = self
                .store
                .append_with(message.clone(), |stored| {
                    if self.feed.send(stored.clone()).is_err() {
                        debug!("Fan-out feed closed, {} not broadcast", stored.id);
                    }
                })
                .await;

            match appended {
                Ok(stored) => {

                    match source {
                        CaptureSource::Native => info!(
                            "📱 SMS captured: To={} Body={}",
                            stored.to,
                            truncate(&stored.body, LOG_BODY_CHARS)
                        ),
                        CaptureSource::Twilio => info!(
                            "📱 SMS captured (Twilio): To={} Body={}",
                            stored.to,
                            truncate(&stored.body, LOG_BODY_CHARS)
                        ),
                    }
                    return Ok(stored);
                }
                Err(StoreError::DuplicateId(id)) => {
                    warn!("Generated id {} already stored, drawing another", id);
                    message.id = source.new_id();
                }
            }
        }

        Err(ApiError::internal("could not allocate a unique message id"))
    }
}

fn require(value: &str, field: &str) -> ApiResult<()> {
    if value.is_empty() {
        return Err(ApiError::validation(format!("Missing '{}' field", field)));
    }
    Ok(())
}

/// Cut `s` to `max_chars` characters, marking the cut with "..."
fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
