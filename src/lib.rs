//! TextSwap client core
//!
//! Library backing the TextSwap used-textbook marketplace front-end. It owns
//! the pieces that are not page markup: the realtime chat channel (websocket
//! with automatic recovery), per-conversation message state, the REST client
//! for the token-auth backend, and the filter/sort/pagination query codec
//! shared by the search pages.
//!
//! The library never installs a tracing subscriber and holds no global state;
//! every component is explicitly constructed and injected by the embedding
//! application.

pub mod api;
pub mod auth;
pub mod channel;
pub mod config;
pub mod conversation;
pub mod query;

pub use api::{ApiClient, ApiError};
pub use auth::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use channel::{ChannelClient, ChannelEvent, ConnectionState, ReconnectConfig, Subscription};
pub use config::ClientConfig;
pub use conversation::{ConversationDirectory, ConversationView, Message, MessageId};
pub use query::{pagination_window, FilterQuery, InvalidPageError, PageToken};
