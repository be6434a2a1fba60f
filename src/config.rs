//! Client Configuration
//!
//! Endpoints for the REST backend and the realtime chat channel, plus the
//! reconnection policy. Loaded from a JSON file or built in code; defaults
//! point at a local development backend.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::channel::ReconnectConfig;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the REST backend, e.g. `https://api.textswap.example`
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Base URL of the websocket chat backend, e.g. `wss://api.textswap.example`
    #[serde(default = "default_ws_base")]
    pub ws_base: String,
    /// Reconnection policy for the realtime channel
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

fn default_api_base() -> String {
    "http://localhost:8000".to_string()
}

fn default_ws_base() -> String {
    "ws://localhost:8000".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            ws_base: default_ws_base(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Build the chat websocket URL for an access token
    ///
    /// The chat backend authenticates the connection from the query string,
    /// so the token travels as `?token=`.
    pub fn ws_url(&self, token: &str) -> String {
        format!(
            "{}/ws/chat/?token={}",
            self.ws_base.trim_end_matches('/'),
            token
        )
    }
}
