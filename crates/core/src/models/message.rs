//! Chat message model
//!
//! Messages carry no public identity beyond the (senderName, timeStamp)
//! pair; that pair is the deletion key the clients echo back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ANONYMOUS_SENDER: &str = "Anonymous";

/// A chat message in a group's log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default = "anonymous")]
    pub sender_name: String,
    pub message: String,
    /// Server-assigned, millisecond precision
    pub time_stamp: DateTime<Utc>,
}

fn anonymous() -> String {
    ANONYMOUS_SENDER.to_string()
}

impl ChatMessage {
    pub fn new(sender_name: Option<String>, message: String) -> Self {
        Self {
            sender_name: sender_name.unwrap_or_else(anonymous),
            message,
            time_stamp: now_millis(),
        }
    }
}

/// Current time truncated to millisecond precision, so stored timestamps
/// compare exactly against the values clients echo back.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_defaults_to_anonymous() {
        let msg = ChatMessage::new(None, "hi".to_string());
        assert_eq!(msg.sender_name, ANONYMOUS_SENDER);
    }

    #[test]
    fn test_timestamp_is_millisecond_precision() {
        let msg = ChatMessage::new(Some("alice".to_string()), "hi".to_string());
        assert_eq!(msg.time_stamp.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn test_wire_field_names() {
        let msg = ChatMessage::new(Some("alice".to_string()), "hi".to_string());
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("senderName").is_some());
        assert!(json.get("timeStamp").is_some());
        assert!(json.get("message").is_some());
    }
}
