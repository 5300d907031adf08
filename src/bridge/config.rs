//! Sync bridge configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sync bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Paths on which session tracking is suspended unconditionally
    /// (pre-authentication screens). Prefix matched.
    #[serde(default = "default_passive_paths")]
    pub passive_paths: Vec<String>,

    /// Path navigated to when the session ends.
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Status poll interval in seconds (default: 2 minutes).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Settle delay before pushing authoritative-state changes into the
    /// lifecycle, in milliseconds (default: 100).
    #[serde(default = "default_push_debounce")]
    pub push_debounce_ms: u64,
}

fn default_passive_paths() -> Vec<String> {
    vec!["/login".to_string(), "/sso".to_string()]
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_poll_interval() -> u64 {
    2 * 60 // 2 minutes
}

fn default_push_debounce() -> u64 {
    100
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            passive_paths: default_passive_paths(),
            login_path: default_login_path(),
            poll_interval_secs: default_poll_interval(),
            push_debounce_ms: default_push_debounce(),
        }
    }
}

impl BridgeConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.login_path.is_empty() {
            return Err("login_path must not be empty".to_string());
        }
        if self.poll_interval_secs == 0 {
            return Err("poll_interval_secs must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Check if session tracking is suspended on `path`.
    pub fn is_passive(&self, path: &str) -> bool {
        self.passive_paths
            .iter()
            .any(|passive| path.starts_with(passive))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn push_debounce(&self) -> Duration {
        Duration::from_millis(self.push_debounce_ms)
    }
}
