//! Token stores
//!
//! Access/refresh token persistence behind the `TokenStore` trait. Reads are
//! synchronous: the channel client needs the access token at connect time
//! without suspending.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Synchronous access to the session's token pair.
///
/// Implementations must be cheap to read; the realtime channel reads the
/// access token on every (re)connect attempt.
pub trait TokenStore: Send + Sync {
    /// Current access token, if a session is active
    fn access_token(&self) -> Option<String>;

    /// Current refresh token, if a session is active
    fn refresh_token(&self) -> Option<String>;

    /// Store a fresh token pair (login)
    fn set_tokens(&self, access: String, refresh: Option<String>);

    /// Replace only the access token (refresh flow)
    fn set_access_token(&self, access: String);

    /// Drop both tokens (logout or failed refresh)
    fn clear(&self);
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TokenPair {
    access: Option<String>,
    refresh: Option<String>,
}

/// In-process token store backed by a `RwLock`
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<TokenPair>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Option<String> {
        self.tokens.read().access.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.tokens.read().refresh.clone()
    }

    fn set_tokens(&self, access: String, refresh: Option<String>) {
        let mut tokens = self.tokens.write();
        tokens.access = Some(access);
        tokens.refresh = refresh;
    }

    fn set_access_token(&self, access: String) {
        self.tokens.write().access = Some(access);
    }

    fn clear(&self) {
        *self.tokens.write() = TokenPair::default();
    }
}

/// JSON-file token store for persistent logins
///
/// Keeps an in-memory copy guarded by a `RwLock` and rewrites the backing
/// file on every mutation. A missing or unreadable file starts the store
/// empty; write failures are logged and the in-memory state stays
/// authoritative for the session.
pub struct FileTokenStore {
    path: PathBuf,
    tokens: RwLock<TokenPair>,
}

impl FileTokenStore {
    /// Open (or initialize) a token store at the default location,
    /// `<config dir>/textswap/tokens.json`.
    pub fn open_default() -> Result<Self, std::io::Error> {
        let dir = dirs::config_dir()
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "no config directory")
            })?
            .join("textswap");
        std::fs::create_dir_all(&dir)?;
        Ok(Self::open(dir.join("tokens.json")))
    }

    /// Open a token store at an explicit path
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let tokens = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Token file {} is corrupt, starting empty: {}", path.display(), e);
                TokenPair::default()
            }),
            Err(_) => TokenPair::default(),
        };
        Self {
            path,
            tokens: RwLock::new(tokens),
        }
    }

    fn persist(&self, tokens: &TokenPair) {
        let raw = match serde_json::to_string_pretty(tokens) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialize tokens: {}", e);
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, raw) {
            warn!("Failed to write token file {}: {}", self.path.display(), e);
        }
    }
}

impl TokenStore for FileTokenStore {
    fn access_token(&self) -> Option<String> {
        self.tokens.read().access.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.tokens.read().refresh.clone()
    }

    fn set_tokens(&self, access: String, refresh: Option<String>) {
        let mut tokens = self.tokens.write();
        tokens.access = Some(access);
        tokens.refresh = refresh;
        self.persist(&tokens);
    }

    fn set_access_token(&self, access: String) {
        let mut tokens = self.tokens.write();
        tokens.access = Some(access);
        self.persist(&tokens);
    }

    fn clear(&self) {
        let mut tokens = self.tokens.write();
        *tokens = TokenPair::default();
        self.persist(&tokens);
    }
}
