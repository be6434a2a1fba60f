//! Realtime Channel Module
//!
//! One live websocket connection to the chat backend per client instance:
//! - Generation-counted supersession (a new `connect` orphans the old tasks)
//! - Fan-out of inbound events to subscribers, in wire arrival order
//! - Bounded exponential backoff with jitter on unexpected close
//! - Observable connection state via a watch channel

mod client;
mod reconnect;
mod types;

pub use client::{ChannelClient, Subscription};
pub use reconnect::{ConnectionState, ReconnectConfig};
pub use types::{ChannelEvent, OutboundFrame};
