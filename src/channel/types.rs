//! Chat wire types
//!
//! Inbound frames are a tagged union on `"type"`; outbound frames carry only
//! the recipient and the text. Both sides are plain JSON.

use serde::{Deserialize, Serialize};

use crate::conversation::Message;

/// An event received on the realtime channel.
///
/// Ephemeral: dispatched to subscribers and dropped, never stored as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChannelEvent {
    /// A chat message relayed by the server
    Message {
        sender: String,
        recipient: String,
        message: String,
    },
    /// Server-side error report
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    /// Out-of-band notification, e.g. the unread push sent on connect
    Notification {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        new_messages: Option<Vec<Message>>,
    },
}

/// An outbound chat frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub recipient: String,
    pub message: String,
}
