//! Session persistence.
//!
//! Namespaced key/value storage with a fixed per-record TTL, backed by a
//! volatile in-memory store and a durable redb store.

pub mod config;
pub mod durable;
pub mod store;
pub mod types;

pub use config::StoreConfig;
pub use store::{SessionStore, FLAT_REHYDRATION_KEYS};
pub use types::{LoginKind, SessionData, SessionKey, SessionRecord, SessionStatus, StoreKind};
