//! Two-store session persistence with per-record TTL.
//!
//! Every recognized key is written under a namespace prefix to one of two
//! backing stores: the volatile store (in-memory, dies with the process) or
//! the durable store (redb file, survives a restart). Expiry is lazy: an
//! expired or undecodable record is removed on read and reported as absent —
//! there is no background sweep.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use super::config::StoreConfig;
use super::durable::DurableStore;
use super::types::{SessionKey, SessionRecord, StoreKind};
use crate::clock::Clock;

/// Flat (unprefixed) keys the durable store exposes for rehydration of the
/// authoritative application state on startup.
pub const FLAT_REHYDRATION_KEYS: [&str; 3] = ["identity_id", "login_kind", "access_scope_id"];

/// Namespaced key/value store with a fixed per-record TTL.
pub struct SessionStore {
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    volatile: RwLock<HashMap<String, Vec<u8>>>,
    durable: DurableStore,
}

impl SessionStore {
    /// Open the store, creating the durable database if needed.
    pub fn open(config: StoreConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate().map_err(|e| anyhow!(e))?;
        let durable = DurableStore::open(config.durable_path.clone())?;
        Ok(Self {
            config,
            clock,
            volatile: RwLock::new(HashMap::new()),
            durable,
        })
    }

    /// Record TTL in seconds.
    pub fn ttl_secs(&self) -> u64 {
        self.config.ttl_secs
    }

    fn qualified(&self, key: SessionKey) -> String {
        format!("{}.{}", self.config.namespace, key.as_str())
    }

    /// Write `value` under `key`, stamping a fresh TTL window.
    pub fn set(&self, key: SessionKey, value: serde_json::Value, kind: StoreKind) -> Result<()> {
        let record = SessionRecord::new(value, self.clock.now(), self.config.ttl_secs);
        let bytes = rmp_serde::to_vec(&record).context("Failed to serialize session record")?;
        let qualified = self.qualified(key);

        match kind {
            StoreKind::Volatile => {
                let mut map = self
                    .volatile
                    .write()
                    .map_err(|_| anyhow!("volatile store lock poisoned"))?;
                map.insert(qualified, bytes);
            }
            StoreKind::Durable => self.durable.put(&qualified, &bytes)?,
        }
        Ok(())
    }

    /// Read the value under `key`, or absent.
    ///
    /// Expired and undecodable records are evicted on read; the caller cannot
    /// distinguish corruption from expiry, and neither is an error.
    pub fn get(&self, key: SessionKey, kind: StoreKind) -> Option<serde_json::Value> {
        self.get_record(key, kind).map(|record| record.value)
    }

    /// Read the full record under `key`, including its TTL window.
    pub fn get_record(&self, key: SessionKey, kind: StoreKind) -> Option<SessionRecord> {
        let qualified = self.qualified(key);

        let bytes = match kind {
            StoreKind::Volatile => {
                let map = self.volatile.read().ok()?;
                map.get(&qualified).cloned()?
            }
            StoreKind::Durable => match self.durable.get(&qualified) {
                Ok(bytes) => bytes?,
                Err(e) => {
                    debug!(key = %key, error = %e, "Durable read failed, treating as absent");
                    return None;
                }
            },
        };

        match rmp_serde::from_slice::<SessionRecord>(&bytes) {
            Ok(record) if !record.is_expired(self.clock.now()) => Some(record),
            Ok(_) => {
                self.evict(&qualified, kind);
                debug!(key = %key, "Evicted expired session record");
                None
            }
            Err(e) => {
                self.evict(&qualified, kind);
                debug!(key = %key, error = %e, "Evicted undecodable session record");
                None
            }
        }
    }

    /// Remove the record under `key`, if any.
    pub fn remove(&self, key: SessionKey, kind: StoreKind) -> Result<()> {
        let qualified = self.qualified(key);
        match kind {
            StoreKind::Volatile => {
                let mut map = self
                    .volatile
                    .write()
                    .map_err(|_| anyhow!("volatile store lock poisoned"))?;
                map.remove(&qualified);
            }
            StoreKind::Durable => {
                self.durable.remove(&qualified)?;
            }
        }
        Ok(())
    }

    /// Presence check across the recognized keys in the volatile store.
    ///
    /// Intentionally does not decode or check expiry — this is the O(1) fast
    /// path for `is_authenticated`.
    pub fn has_any_volatile(&self) -> bool {
        let Ok(map) = self.volatile.read() else {
            return false;
        };
        SessionKey::ALL
            .iter()
            .any(|key| map.contains_key(&self.qualified(*key)))
    }

    /// Wipe all namespaced keys from one backing store.
    pub fn clear_store(&self, kind: StoreKind) -> Result<()> {
        let removed = match kind {
            StoreKind::Volatile => {
                let mut map = self
                    .volatile
                    .write()
                    .map_err(|_| anyhow!("volatile store lock poisoned"))?;
                let count = map.len();
                map.clear();
                count
            }
            StoreKind::Durable => self.durable.clear_records()?,
        };

        if removed > 0 {
            debug!(removed, store = ?kind, "Cleared session records");
        }
        Ok(())
    }

    /// Wipe all namespaced keys from both stores and the flat rehydration
    /// keys. Quiet no-op when nothing is present — public, unauthenticated
    /// contexts call this routinely.
    pub fn clear(&self) -> Result<()> {
        let mut removed = {
            let mut map = self
                .volatile
                .write()
                .map_err(|_| anyhow!("volatile store lock poisoned"))?;
            let count = map.len();
            map.clear();
            count
        };
        removed += self.durable.clear_records()?;
        removed += self.durable.clear_flat()?;

        if removed > 0 {
            debug!(removed, "Cleared session stores");
        }
        Ok(())
    }

    /// Write a flat rehydration value into the durable store.
    pub fn set_flat(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let bytes = serde_json::to_vec(value).context("Failed to serialize flat value")?;
        self.durable.put_flat(key, &bytes)
    }

    /// Read a flat rehydration value from the durable store.
    pub fn get_flat(&self, key: &str) -> Option<serde_json::Value> {
        match self.durable.get_flat(key) {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).ok(),
            Ok(None) => None,
            Err(e) => {
                debug!(key, error = %e, "Flat read failed, treating as absent");
                None
            }
        }
    }

    fn evict(&self, qualified: &str, kind: StoreKind) {
        match kind {
            StoreKind::Volatile => {
                if let Ok(mut map) = self.volatile.write() {
                    map.remove(qualified);
                }
            }
            StoreKind::Durable => {
                let _ = self.durable.remove(qualified);
            }
        }
    }
}
