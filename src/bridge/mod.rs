//! Navigation-driven orchestration of the session lifecycle.

pub mod config;
pub mod fingerprint;
pub mod sync;

pub use config::BridgeConfig;
pub use fingerprint::{AuthFingerprint, AuthSnapshot};
pub use sync::{AuthStateSink, SyncBridge};
