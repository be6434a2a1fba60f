//! Conversation directory
//!
//! Cross-conversation unread counts and last-message previews for the
//! sidebar. Keyed by the other participant's username; safe to update from
//! the channel's dispatch path while the UI reads snapshots.

use dashmap::DashMap;

use crate::channel::ChannelEvent;

#[derive(Debug, Default, Clone)]
struct Entry {
    last_message: String,
    unread: usize,
}

/// One sidebar row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub peer: String,
    pub last_message: String,
    pub unread: usize,
}

/// Directory of all known conversations
#[derive(Default)]
pub struct ConversationDirectory {
    entries: DashMap<String, Entry>,
}

impl ConversationDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a channel event through the directory.
    ///
    /// Inbound messages addressed to `me` bump the sender's unread count;
    /// our own outbound echoes only refresh the preview. Non-message events
    /// are ignored.
    pub fn observe(&self, event: &ChannelEvent, me: &str) {
        let ChannelEvent::Message {
            sender,
            recipient,
            message,
        } = event
        else {
            return;
        };
        if recipient == me {
            let mut entry = self.entries.entry(sender.clone()).or_default();
            entry.unread += 1;
            entry.last_message = message.clone();
        } else if sender == me {
            let mut entry = self.entries.entry(recipient.clone()).or_default();
            entry.last_message = message.clone();
        }
    }

    /// Reset a peer's unread count (conversation opened)
    pub fn mark_read(&self, peer: &str) {
        if let Some(mut entry) = self.entries.get_mut(peer) {
            entry.unread = 0;
        }
    }

    /// Total unread across all conversations (navbar badge)
    pub fn unread_total(&self) -> usize {
        self.entries.iter().map(|e| e.unread).sum()
    }

    /// Sidebar rows, sorted by peer for stable display
    pub fn snapshot(&self) -> Vec<ConversationSummary> {
        let mut rows: Vec<ConversationSummary> = self
            .entries
            .iter()
            .map(|e| ConversationSummary {
                peer: e.key().clone(),
                last_message: e.last_message.clone(),
                unread: e.unread,
            })
            .collect();
        rows.sort_by(|a, b| a.peer.cmp(&b.peer));
        rows
    }
}
