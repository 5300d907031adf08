//! Inactivity-based session lifecycle.
//!
//! The state machine that owns the warning/expiry timers, the validation
//! cache, and the login/extend/logout/status operations.

pub mod cache;
pub mod config;
pub mod manager;
pub mod subscribers;

pub use config::LifecycleConfig;
pub use manager::{LifecycleState, SessionLifecycle};
pub use subscribers::Subscription;
