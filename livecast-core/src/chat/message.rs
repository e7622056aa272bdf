use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Config;

/// A single chat message as displayed to the viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique within the reconciled list. Optimistic entries carry a
    /// `pending-` prefixed id until the stream confirms them.
    pub message_id: String,
    pub user_id: String,
    pub display_name: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Whether this is an optimistic local echo, not yet confirmed upstream.
    pub fn is_pending(&self) -> bool {
        self.message_id.starts_with(Config::PENDING_ID_PREFIX)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pending_ids_are_detected() {
        let mut message = ChatMessage {
            message_id: "m1".to_string(),
            user_id: "u1".to_string(),
            display_name: "One".to_string(),
            text: "hello".to_string(),
            sent_at: Utc::now(),
        };

        assert!(!message.is_pending());

        message.message_id = format!("{}abc123", Config::PENDING_ID_PREFIX);
        assert!(message.is_pending());
    }

    #[test]
    fn test_wire_format_uses_snake_case() {
        let message = ChatMessage {
            message_id: "m1".to_string(),
            user_id: "u1".to_string(),
            display_name: "One".to_string(),
            text: "hello".to_string(),
            sent_at: Utc::now(),
        };

        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["message_id"], "m1");
        assert_eq!(value["display_name"], "One");

        assert_eq!(
            serde_json::to_value(crate::PlaybackState::Playing).unwrap(),
            "playing"
        );
    }
}
