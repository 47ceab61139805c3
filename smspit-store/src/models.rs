//! Data models for captured messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status every stored message carries
pub const STATUS_CAPTURED: &str = "captured";

/// A captured SMS message
///
/// Never mutated once it has been appended to a [`MessageStore`](crate::MessageStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Build a message in the `captured` state
    pub fn captured(
        id: impl Into<String>,
        to: impl Into<String>,
        from: impl Into<String>,
        body: impl Into<String>,
        tags: Vec<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            to: to.into(),
            from: from.into(),
            body: body.into(),
            tags,
            status: STATUS_CAPTURED.to_string(),
            created_at,
        }
    }
}

/// Filter for [`MessageStore::search`](crate::MessageStore::search)
///
/// Matching is a case-sensitive substring test. `q` matches against the body
/// or the recipient, `to` against the recipient only, and both must hold when
/// both are set. An empty component places no constraint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub to: String,
}

impl SearchQuery {
    /// Free-text query only
    pub fn text(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            to: String::new(),
        }
    }

    /// Recipient filter only
    pub fn recipient(to: impl Into<String>) -> Self {
        Self {
            q: String::new(),
            to: to.into(),
        }
    }

    pub fn matches(&self, message: &Message) -> bool {
        if !self.q.is_empty() && !message.body.contains(&self.q) && !message.to.contains(&self.q) {
            return false;
        }
        if !self.to.is_empty() && !message.to.contains(&self.to) {
            return false;
        }
        true
    }
}

/// Aggregate counts over the current store contents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_messages: usize,
    pub unique_recipients: usize,
    pub messages_last_24h: usize,
    pub messages_last_hour: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(to: &str, body: &str) -> Message {
        Message::captured("msg_00000000", to, "", body, Vec::new(), Utc::now())
    }

    #[test]
    fn test_empty_optional_fields_are_omitted() {
        let json = serde_json::to_string(&sample("+15550001111", "hi")).unwrap();
        assert!(!json.contains("\"from\""));
        assert!(!json.contains("\"tags\""));
        assert!(json.contains("\"status\":\"captured\""));
        assert!(json.contains("\"created_at\""));
    }

    #[test]
    fn test_tags_keep_insertion_order() {
        let mut message = sample("+15550001111", "hi");
        message.tags = vec!["otp".to_string(), "auth".to_string(), "a".to_string()];
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"tags\":[\"otp\",\"auth\",\"a\"]"));
    }

    #[test]
    fn test_query_text_matches_body_or_recipient() {
        let query = SearchQuery::text("555");
        assert!(query.matches(&sample("+15550001111", "hello")));
        assert!(query.matches(&sample("+44", "call 555")));
        assert!(!query.matches(&sample("+44", "hello")));
    }

    #[test]
    fn test_query_is_case_sensitive() {
        let query = SearchQuery::text("Code");
        assert!(!query.matches(&sample("+1", "your code is 1")));
        assert!(query.matches(&sample("+1", "your Code is 1")));
    }

    #[test]
    fn test_query_components_combine_with_and() {
        let query = SearchQuery {
            q: "code".to_string(),
            to: "+1555".to_string(),
        };
        assert!(query.matches(&sample("+15550001111", "code 1")));
        assert!(!query.matches(&sample("+4470000", "code 1")));
        assert!(!query.matches(&sample("+15550001111", "hello")));
    }

    #[test]
    fn test_empty_query_matches_everything() {
        assert!(SearchQuery::default().matches(&sample("", "x")));
    }
}
