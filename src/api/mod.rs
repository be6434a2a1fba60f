//! REST Client Module
//!
//! Token-authenticated access to the marketplace backend: login/refresh,
//! chat history and mark-as-seen, and the textbook search endpoints. Every
//! request carries the current bearer token from the injected [`TokenStore`];
//! a 401 triggers one transparent refresh-and-retry.
//!
//! [`TokenStore`]: crate::auth::TokenStore

mod client;
mod types;

pub use client::{ApiClient, ApiError};
pub use types::{Textbook, TextbookPage, UserProfile};
