//! Per-conversation message view
//!
//! Merges the one-shot fetched history with live channel events into a
//! single display-ordered sequence: history first, then live appends, each
//! in arrival order. No re-sorting by timestamp happens; if the network
//! delivers out of order, display order reflects arrival order.

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::types::{Message, MessageId};
use crate::api::{ApiClient, ApiError};
use crate::channel::ChannelEvent;

/// The open conversation with one peer
#[derive(Debug, Clone)]
pub struct ConversationView {
    me: String,
    peer: String,
    messages: Vec<Message>,
}

impl ConversationView {
    /// Empty view; call [`load_history`](Self::load_history) to populate it
    pub fn new(me: impl Into<String>, peer: impl Into<String>) -> Self {
        Self {
            me: me.into(),
            peer: peer.into(),
            messages: Vec::new(),
        }
    }

    /// Open a conversation the fail-soft way: a failed history fetch logs
    /// and yields an empty view instead of blocking the UI, and the
    /// mark-as-seen batch is fired best-effort with its error swallowed.
    pub async fn open_or_empty(
        api: &ApiClient,
        me: impl Into<String>,
        peer: impl Into<String>,
    ) -> Self {
        let mut view = Self::new(me, peer);
        if let Err(e) = view.load_history(api).await {
            warn!("History fetch for {} failed, starting empty: {}", view.peer, e);
        }
        if let Err(e) = view.mark_history_seen(api).await {
            warn!("Mark-as-seen for {} failed: {}", view.peer, e);
        }
        view
    }

    /// Fetch the conversation history once.
    ///
    /// Fetched messages become the head of the sequence; any optimistic
    /// appends that arrived meanwhile keep their place after it. Returns the
    /// number of messages fetched so the caller can decide how to react to
    /// failure instead of the error being discarded.
    pub async fn load_history(&mut self, api: &ApiClient) -> Result<usize, ApiError> {
        let history = api.conversation(&self.peer).await?;
        let fetched = history.len();
        let live: Vec<Message> = self
            .messages
            .drain(..)
            .filter(|m| m.id.is_local())
            .collect();
        self.messages = history;
        self.messages.extend(live);
        debug!("Loaded {} history messages for {}", fetched, self.peer);
        Ok(fetched)
    }

    /// Batch-mark every unseen server message addressed to us.
    ///
    /// On success the local `seen` flags flip as well, keeping the unread
    /// count in step. Returns how many messages were marked.
    pub async fn mark_history_seen(&mut self, api: &ApiClient) -> Result<usize, ApiError> {
        let ids: Vec<i64> = self
            .messages
            .iter()
            .filter(|m| !m.seen && m.recipient == self.me)
            .filter_map(|m| match m.id {
                MessageId::Server(id) => Some(id),
                MessageId::Local(_) => None,
            })
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }
        api.mark_seen(&ids).await?;
        for message in &mut self.messages {
            if matches!(message.id, MessageId::Server(id) if ids.contains(&id)) {
                message.seen = true;
            }
        }
        Ok(ids.len())
    }

    /// Ingest a live channel event.
    ///
    /// A `message` event whose sender or recipient is the open peer is
    /// appended at the tail with a fresh local id; everything else is
    /// ignored by this view (other subscribers may still care). Returns
    /// whether a message was appended.
    pub fn on_channel_event(&mut self, event: &ChannelEvent) -> bool {
        let ChannelEvent::Message {
            sender,
            recipient,
            message,
        } = event
        else {
            return false;
        };
        if sender != &self.peer && recipient != &self.peer {
            return false;
        }
        self.messages.push(Message {
            id: MessageId::local(),
            sender: sender.clone(),
            recipient: recipient.clone(),
            text: message.clone(),
            seen: false,
            sent_at: Utc::now(),
        });
        true
    }

    /// Swap an optimistic append's local id for the server-assigned one.
    ///
    /// Returns false if no message carries `local`.
    pub fn confirm_message(&mut self, local: Uuid, server_id: i64) -> bool {
        for message in &mut self.messages {
            if message.id == MessageId::Local(local) {
                message.id = MessageId::Server(server_id);
                return true;
            }
        }
        false
    }

    /// Count of unseen messages addressed to us
    pub fn unread_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| !m.seen && m.recipient == self.me)
            .count()
    }

    pub fn me(&self) -> &str {
        &self.me
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Display-ordered message sequence
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}
