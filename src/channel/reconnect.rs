//! Reconnection policy
//!
//! Bounded exponential backoff with jitter for the realtime channel. The
//! first retry waits the initial delay (matching the backend's expectation of
//! a ~3 s pause); subsequent retries grow geometrically up to a cap, with a
//! random jitter factor so that many clients do not reconnect in lockstep.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Reconnection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Whether to reconnect automatically after an unexpected close
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Maximum number of consecutive failed attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first reconnection attempt (ms)
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Ceiling on the delay between attempts (ms)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Jitter fraction in `[0, 1]`; the delay is scaled by a random factor
    /// in `[1 - jitter, 1 + jitter]`
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

fn default_enabled() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    10
}

fn default_initial_delay_ms() -> u64 {
    3000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

fn default_jitter() -> f64 {
    0.2
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: default_jitter(),
        }
    }
}

impl ReconnectConfig {
    /// Base delay for attempt number `attempt` (1-based), before jitter
    fn base_delay_ms(&self, attempt: u32) -> u64 {
        let base = self.initial_delay_ms as f64;
        let delay = base * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        delay.min(self.max_delay_ms as f64) as u64
    }

    /// Delay to wait before attempt number `attempt` (1-based), with jitter
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay_ms(attempt) as f64;
        let jitter = self.jitter.clamp(0.0, 1.0);
        let factor = if jitter > 0.0 {
            rand::thread_rng().gen_range(1.0 - jitter..=1.0 + jitter)
        } else {
            1.0
        };
        Duration::from_millis((base * factor) as u64)
    }
}

/// Observable state of the realtime channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No connection requested, or explicitly disconnected
    Disconnected,
    /// First attempt for this `connect` call is in flight
    Connecting,
    /// Connection established; outbound sends are accepted
    Open,
    /// Connection lost; waiting out the backoff or retrying
    Reconnecting,
    /// Retry budget exhausted; waiting for an explicit `connect`
    Failed,
}
