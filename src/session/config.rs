//! Session store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Session store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Namespace prefix applied to every recognized key.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Fixed record TTL in seconds (default: 30 minutes).
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,

    /// Durable store path (redb database file).
    #[serde(default = "default_durable_path")]
    pub durable_path: PathBuf,
}

fn default_namespace() -> String {
    "console.session".to_string()
}

fn default_ttl() -> u64 {
    30 * 60 // 30 minutes
}

fn default_durable_path() -> PathBuf {
    PathBuf::from("/var/lib/console-session/session.redb")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            ttl_secs: default_ttl(),
            durable_path: default_durable_path(),
        }
    }
}

impl StoreConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.namespace.is_empty() {
            return Err("store namespace must not be empty".to_string());
        }
        if self.ttl_secs == 0 {
            return Err("store ttl_secs must be greater than zero".to_string());
        }
        Ok(())
    }
}
