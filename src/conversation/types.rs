//! Message types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a chat message.
///
/// The backend assigns integer ids; optimistically appended messages get a
/// client-side UUID until (if ever) the server confirms them. UUIDs keep
/// list identity stable without relying on wall-clock time, which can
/// collide or go backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    /// Server-assigned id
    Server(i64),
    /// Client-generated id for an optimistic append
    Local(Uuid),
}

impl MessageId {
    /// Generate a fresh local id
    pub fn local() -> Self {
        MessageId::Local(Uuid::new_v4())
    }

    pub fn is_local(&self) -> bool {
        matches!(self, MessageId::Local(_))
    }
}

/// A single chat message.
///
/// Immutable once ingested, except `seen`, which only ever flips
/// false → true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: String,
    pub recipient: String,
    pub text: String,
    #[serde(default)]
    pub seen: bool,
    pub sent_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_deserializes() {
        let raw = r#"{"id":42,"sender":"ann","recipient":"bob","text":"hi","seen":false,"sent_at":"2025-03-01T12:00:00Z"}"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.id, MessageId::Server(42));
        assert_eq!(msg.text, "hi");
        assert!(!msg.seen);
    }

    #[test]
    fn test_local_id_roundtrip() {
        let id = MessageId::local();
        let raw = serde_json::to_string(&id).unwrap();
        let back: MessageId = serde_json::from_str(&raw).unwrap();
        assert_eq!(id, back);
        assert!(back.is_local());
    }

    #[test]
    fn test_local_ids_are_unique() {
        assert_ne!(MessageId::local(), MessageId::local());
    }
}
