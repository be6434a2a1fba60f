//! Conversation State Module
//!
//! Chronological per-peer message views merged from fetched history and live
//! channel events, with seen/unseen tracking, plus a directory of unread
//! counts across all conversations for the sidebar badges.

mod directory;
mod types;
mod view;

pub use directory::{ConversationDirectory, ConversationSummary};
pub use types::{Message, MessageId};
pub use view::ConversationView;
