//! Relay wire protocol
//!
//! Events are JSON objects tagged by a `type` field, carried inside
//! length-prefixed frames. Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn anonymous() -> String {
    "Anonymous".to_string()
}

/// A chat message as carried over the relay.
///
/// This mirrors the persisted shape but is deliberately independent of
/// the storage types; the relay never touches the database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    #[serde(default = "anonymous")]
    pub sender_name: String,
    pub message: String,
    pub time_stamp: DateTime<Utc>,
}

/// Events sent by clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Subscribe to a group's room
    JoinGroup { group_url: String },
    /// Unsubscribe from a group's room
    LeaveGroup { group_url: String },
    /// Fan a message out to everyone in the room, the sender included
    SendMessage {
        group_url: String,
        message: ChatPayload,
    },
}

/// Events sent by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// A message was posted to a room this connection has joined
    NewMessage { message: ChatPayload },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_wire_shape() {
        let event = ClientEvent::JoinGroup {
            group_url: "team-x".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "joinGroup");
        assert_eq!(json["groupUrl"], "team-x");
    }

    #[test]
    fn test_send_message_wire_shape() {
        let event = ClientEvent::SendMessage {
            group_url: "team-x".to_string(),
            message: ChatPayload {
                sender_name: "alice".to_string(),
                message: "hi".to_string(),
                time_stamp: Utc::now(),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "sendMessage");
        assert_eq!(json["message"]["senderName"], "alice");
        assert!(json["message"]["timeStamp"].is_string());
    }

    #[test]
    fn test_missing_sender_defaults_anonymous() {
        let json = r#"{"type":"sendMessage","groupUrl":"team-x","message":{"message":"hi","timeStamp":"2026-01-01T00:00:00Z"}}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        match event {
            ClientEvent::SendMessage { message, .. } => {
                assert_eq!(message.sender_name, "Anonymous");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_server_event_wire_shape() {
        let event = ServerEvent::NewMessage {
            message: ChatPayload {
                sender_name: "alice".to_string(),
                message: "hi".to_string(),
                time_stamp: Utc::now(),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "newMessage");
        assert_eq!(json["message"]["message"], "hi");
    }
}
