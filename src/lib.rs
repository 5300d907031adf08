//! Client-side session lifecycle manager for the admin console.
//!
//! An inactivity-based authentication-session state machine with two
//! persistence stores of different lifetimes, a validation cache, and a
//! navigation-driven orchestration layer:
//!
//! - [`session::SessionStore`] — namespaced key/value persistence with a
//!   per-record TTL over a volatile (in-memory) and a durable (redb) store.
//! - [`activity::ActivityTracker`] — O(1) fire-and-forget reporting of user
//!   interaction signals.
//! - [`lifecycle::SessionLifecycle`] — the state machine owning the warning
//!   and expiry timers and the login/extend/logout/status operations.
//! - [`bridge::SyncBridge`] — arms/disarms tracking per navigational context,
//!   mirrors notifications into the authoritative auth state, polls status
//!   for countdown display, and pushes authoritative-state changes into the
//!   lifecycle, debounced and deduplicated.
//!
//! The embedding shell verifies credentials against a remote authority and
//! renders all UI; this crate only manages the local session once credentials
//! are accepted.

pub mod activity;
pub mod bridge;
pub mod clock;
pub mod lifecycle;
pub mod session;

pub use activity::{ActivityTracker, InteractionSignal};
pub use bridge::{AuthFingerprint, AuthSnapshot, AuthStateSink, BridgeConfig, SyncBridge};
pub use clock::{Clock, SystemClock};
pub use lifecycle::{LifecycleConfig, LifecycleState, SessionLifecycle, Subscription};
pub use session::{
    LoginKind, SessionData, SessionKey, SessionRecord, SessionStatus, SessionStore, StoreConfig,
    StoreKind,
};
