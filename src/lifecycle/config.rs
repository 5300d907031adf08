//! Session lifecycle configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LifecycleConfig {
    /// Session TTL in seconds (default: 30 minutes).
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,

    /// How long before expiry the warning fires, in seconds (default: 5
    /// minutes, i.e. the warning fires 25 minutes into an idle session).
    #[serde(default = "default_warning_window")]
    pub warning_window_secs: u64,

    /// How long a cached negative validation result is trusted, in
    /// milliseconds (default: 5 seconds). A cached positive result is sticky
    /// until a state-changing operation invalidates it.
    #[serde(default = "default_negative_cache_window")]
    pub negative_cache_window_ms: u64,
}

fn default_ttl() -> u64 {
    30 * 60 // 30 minutes
}

fn default_warning_window() -> u64 {
    5 * 60 // 5 minutes
}

fn default_negative_cache_window() -> u64 {
    5_000
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            warning_window_secs: default_warning_window(),
            negative_cache_window_ms: default_negative_cache_window(),
        }
    }
}

impl LifecycleConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.ttl_secs == 0 {
            return Err("ttl_secs must be greater than zero".to_string());
        }
        if self.warning_window_secs >= self.ttl_secs {
            return Err("warning_window_secs must be smaller than ttl_secs".to_string());
        }
        Ok(())
    }

    /// Full session TTL.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Delay from (re)arming until the warning timer fires.
    pub fn warning_delay(&self) -> Duration {
        Duration::from_secs(self.ttl_secs - self.warning_window_secs)
    }

    /// Negative-result cache window.
    pub fn negative_cache_window(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.negative_cache_window_ms as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LifecycleConfig::default();
        assert_eq!(config.ttl_secs, 30 * 60);
        assert_eq!(config.warning_window_secs, 5 * 60);
        assert_eq!(config.warning_delay(), Duration::from_secs(25 * 60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = LifecycleConfig::default();
        config.ttl_secs = 0;
        assert!(config.validate().is_err());

        config.ttl_secs = 60;
        config.warning_window_secs = 60;
        assert!(config.validate().is_err());

        config.warning_window_secs = 30;
        assert!(config.validate().is_ok());
    }
}
