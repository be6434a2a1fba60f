//! Token Storage Module
//!
//! The chat channel and the REST client only need a way to read the current
//! access/refresh token pair at call time; where the pair lives is the
//! embedding application's choice. `TokenStore` is that seam, with an
//! in-memory store for tests and short-lived sessions and a JSON-file store
//! for persistent logins.

mod store;

pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
