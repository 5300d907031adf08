//! The session lifecycle state machine.
//!
//! Owns the warning/expiry timers, the validation cache, and the public
//! login/extend/logout/status operations. Constructed explicitly and shared
//! by `Arc`; timer tasks hold only weak references, so dropping the last
//! external handle tears the machine down.

use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::cache::ValidationCache;
use super::config::LifecycleConfig;
use super::subscribers::{SubscriberSet, Subscription};
use crate::clock::Clock;
use crate::session::{SessionData, SessionKey, SessionStatus, SessionStore, StoreKind};

/// Lifecycle state, owned exclusively by [`SessionLifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No session is being tracked.
    Disarmed,
    /// A session is being tracked and has not reached the warning point.
    Active,
    /// The warning timer has fired; the session is still alive.
    Warning,
    /// The expiry timer fired and wiped the session.
    Expired,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Disarmed => write!(f, "disarmed"),
            LifecycleState::Active => write!(f, "active"),
            LifecycleState::Warning => write!(f, "warning"),
            LifecycleState::Expired => write!(f, "expired"),
        }
    }
}

/// Short random instance id (8 random bytes, hex-encoded in logs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LifecycleId([u8; 8]);

impl LifecycleId {
    fn new() -> Self {
        Self(rand::random())
    }
}

impl std::fmt::Display for LifecycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

struct LifecycleInner {
    state: LifecycleState,
    /// Sticky once the warning timer fires; only `extend_session` (or the
    /// session ending) clears it. Activity does not.
    warning_raised: bool,
    cache: ValidationCache,
    /// Bumped on every arm/cancel; a firing timer that lost the race against
    /// a newer pair sees a stale epoch and does nothing.
    timer_epoch: u64,
    warning_timer: Option<JoinHandle<()>>,
    expiry_timer: Option<JoinHandle<()>>,
    validation_failure_logged: bool,
}

/// Inactivity-based session state machine.
pub struct SessionLifecycle {
    id: LifecycleId,
    config: LifecycleConfig,
    store: Arc<SessionStore>,
    clock: Arc<dyn Clock>,
    inner: Mutex<LifecycleInner>,
    warning_subs: Mutex<SubscriberSet>,
    expired_subs: Mutex<SubscriberSet>,
    expiry_fallback: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
}

impl SessionLifecycle {
    /// Create a lifecycle over `store`.
    ///
    /// The configured TTL must match the store's record TTL: the expiry timer
    /// and the persisted `expires_at` stamps describe the same deadline.
    pub fn new(
        store: Arc<SessionStore>,
        config: LifecycleConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>> {
        config.validate().map_err(|e| anyhow!(e))?;
        if config.ttl_secs != store.ttl_secs() {
            return Err(anyhow!(
                "lifecycle TTL ({}s) does not match store TTL ({}s)",
                config.ttl_secs,
                store.ttl_secs()
            ));
        }

        Ok(Arc::new(Self {
            id: LifecycleId::new(),
            config,
            store,
            clock,
            inner: Mutex::new(LifecycleInner {
                state: LifecycleState::Disarmed,
                warning_raised: false,
                cache: ValidationCache::default(),
                timer_epoch: 0,
                warning_timer: None,
                expiry_timer: None,
                validation_failure_logged: false,
            }),
            warning_subs: Mutex::new(SubscriberSet::default()),
            expired_subs: Mutex::new(SubscriberSet::default()),
            expiry_fallback: Mutex::new(None),
        }))
    }

    /// Start tracking a session: persist the present fields of `data` into
    /// the volatile store, mirror the rehydration values into the durable
    /// flat keys, arm both timers, and invalidate the validation cache.
    pub fn login(self: &Arc<Self>, data: &SessionData) -> Result<()> {
        for (key, value) in data.entries() {
            self.store.set(key, value, StoreKind::Volatile)?;
        }
        if let Some(ref id) = data.identity_id {
            self.store
                .set_flat("identity_id", &serde_json::Value::String(id.clone()))?;
        }
        if let Some(ref id) = data.access_scope_id {
            self.store
                .set_flat("access_scope_id", &serde_json::Value::String(id.clone()))?;
        }

        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow!("lifecycle lock poisoned"))?;
        inner.cache.invalidate();
        inner.warning_raised = false;
        inner.state = LifecycleState::Active;
        self.arm_timers(&mut inner);
        drop(inner);

        debug!(lifecycle = %self.id, "Session started");
        Ok(())
    }

    /// Refresh the TTL of every key currently present, clear the warning
    /// flag, and re-arm both timers. No-op when no session is being tracked.
    pub fn extend_session(self: &Arc<Self>) -> Result<()> {
        {
            let inner = self
                .inner
                .lock()
                .map_err(|_| anyhow!("lifecycle lock poisoned"))?;
            if matches!(
                inner.state,
                LifecycleState::Disarmed | LifecycleState::Expired
            ) {
                return Ok(());
            }
        }

        for key in SessionKey::ALL {
            if let Some(value) = self.store.get(key, StoreKind::Volatile) {
                self.store.set(key, value, StoreKind::Volatile)?;
            }
        }

        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow!("lifecycle lock poisoned"))?;
        inner.cache.invalidate();
        inner.warning_raised = false;
        inner.state = LifecycleState::Active;
        self.arm_timers(&mut inner);
        drop(inner);

        debug!(lifecycle = %self.id, "Session extended");
        Ok(())
    }

    /// End the session: same cleanup as the expiry path, but no subscriber
    /// is notified (the caller already knows it logged out).
    pub fn logout(&self) -> Result<()> {
        self.clear_session()
    }

    /// Wipe both stores, cancel timers, and reset to `Disarmed`.
    ///
    /// Idempotent; repeated calls are quiet no-ops, not errors.
    pub fn clear_session(&self) -> Result<()> {
        let was_tracking = {
            let mut inner = self
                .inner
                .lock()
                .map_err(|_| anyhow!("lifecycle lock poisoned"))?;
            let was_tracking = inner.state != LifecycleState::Disarmed;
            Self::cancel_timers(&mut inner);
            inner.cache.invalidate();
            inner.warning_raised = false;
            inner.state = LifecycleState::Disarmed;
            was_tracking
        };

        self.store.clear()?;

        if was_tracking {
            debug!(lifecycle = %self.id, "Session cleared");
        }
        Ok(())
    }

    /// Report user activity: cancel and re-arm both timers from "now".
    ///
    /// O(1) and safe to call at pointer-move frequency. Does not clear an
    /// already-raised warning flag.
    pub fn record_activity(self: &Arc<Self>) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if matches!(
            inner.state,
            LifecycleState::Disarmed | LifecycleState::Expired
        ) {
            return;
        }
        self.arm_timers(&mut inner);
    }

    /// Whether a live session exists. Fail-closed: any internal failure
    /// reports `false` and is logged once.
    ///
    /// A call that performs a full recomputation also counts as user
    /// activity and resets the inactivity timers. Whether that is intentional
    /// for non-interactive callers is deliberately left as the source
    /// behavior; see the tests covering it.
    pub fn is_authenticated(self: &Arc<Self>) -> bool {
        match self.validate() {
            Ok(valid) => valid,
            Err(e) => {
                if let Ok(mut inner) = self.inner.lock() {
                    if !inner.validation_failure_logged {
                        inner.validation_failure_logged = true;
                        error!(lifecycle = %self.id, error = %e, "Validation failed, treating as logged out");
                    }
                }
                false
            }
        }
    }

    fn validate(self: &Arc<Self>) -> Result<bool> {
        // Fast path: presence only, no decoding.
        if !self.store.has_any_volatile() {
            return Ok(false);
        }

        let now = self.clock.now();
        let (valid, recomputed) = {
            let mut inner = self
                .inner
                .lock()
                .map_err(|_| anyhow!("lifecycle lock poisoned"))?;
            match inner.cache.lookup(now, self.config.negative_cache_window()) {
                Some(cached) => (cached, false),
                None => {
                    let valid = SessionKey::ALL
                        .iter()
                        .any(|key| self.store.get_record(*key, StoreKind::Volatile).is_some());
                    inner.cache.store(valid, now);
                    (valid, true)
                }
            }
        };

        if recomputed {
            self.record_activity();
        }
        Ok(valid)
    }

    /// Countdown snapshot derived from the identity-id record. Display only;
    /// never resets timers and must not gate authorization.
    pub fn get_session_status(&self) -> SessionStatus {
        match self
            .store
            .get_record(SessionKey::IdentityId, StoreKind::Volatile)
        {
            Some(record) => {
                let remaining_ms = record.remaining_ms(self.clock.now());
                SessionStatus {
                    is_valid: remaining_ms > 0,
                    remaining_ms,
                    message: "session active".to_string(),
                }
            }
            None => {
                let expired = self
                    .inner
                    .lock()
                    .map(|inner| inner.state == LifecycleState::Expired)
                    .unwrap_or(false);
                SessionStatus {
                    is_valid: false,
                    remaining_ms: 0,
                    message: if expired {
                        "session expired".to_string()
                    } else {
                        "no active session".to_string()
                    },
                }
            }
        }
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        self.inner
            .lock()
            .map(|inner| inner.state)
            .unwrap_or(LifecycleState::Disarmed)
    }

    /// Whether the warning flag is raised (sticky until `extend_session`).
    pub fn warning_raised(&self) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.warning_raised)
            .unwrap_or(false)
    }

    /// Subscribe to warning firings. Subscribers are invoked in registration
    /// order, each exactly once per firing.
    pub fn on_warning(&self, callback: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.warning_subs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribe(Arc::new(callback))
    }

    pub fn unsubscribe_warning(&self, subscription: Subscription) -> bool {
        self.warning_subs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .unsubscribe(subscription)
    }

    /// Subscribe to expiry firings.
    pub fn on_expired(&self, callback: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.expired_subs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribe(Arc::new(callback))
    }

    pub fn unsubscribe_expired(&self, subscription: Subscription) -> bool {
        self.expired_subs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .unsubscribe(subscription)
    }

    /// Clear the warning flag without extending the session (the warning
    /// UI's explicit dismiss). The timers keep running: the session still
    /// expires on its original schedule.
    pub fn dismiss_warning(&self) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner.warning_raised {
            inner.warning_raised = false;
            if inner.state == LifecycleState::Warning {
                inner.state = LifecycleState::Active;
            }
        }
    }

    /// Fallback invoked at expiry when no subscriber is registered — the
    /// stand-in for a hard redirect to the login context.
    pub fn set_expiry_fallback(&self, fallback: impl Fn() + Send + Sync + 'static) {
        *self
            .expiry_fallback
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(fallback));
    }

    /// Cancel timers without touching the stores (consumer teardown).
    pub fn stop(&self) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        Self::cancel_timers(&mut inner);
        inner.state = LifecycleState::Disarmed;
    }

    /// Process-teardown hook: cancel timers and synchronously clear the
    /// volatile store, so nothing session-scoped outlives the shell.
    pub fn shutdown(&self) {
        {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            Self::cancel_timers(&mut inner);
            inner.cache.invalidate();
            inner.state = LifecycleState::Disarmed;
        }
        if let Err(e) = self.store.clear_store(StoreKind::Volatile) {
            warn!(lifecycle = %self.id, error = %e, "Failed to clear volatile store on shutdown");
        }
    }

    /// Arm a fresh timer pair, cancelling any existing pair first so at most
    /// one warning and one expiry timer ever exist (last-write-wins).
    fn arm_timers(self: &Arc<Self>, inner: &mut LifecycleInner) {
        Self::cancel_timers(inner);
        let epoch = inner.timer_epoch;

        let weak = Arc::downgrade(self);
        let clock = Arc::clone(&self.clock);
        let delay = self.config.warning_delay();
        inner.warning_timer = Some(tokio::spawn(async move {
            clock.sleep(delay).await;
            if let Some(lifecycle) = weak.upgrade() {
                lifecycle.warning_fired(epoch);
            }
        }));

        let weak = Arc::downgrade(self);
        let clock = Arc::clone(&self.clock);
        let ttl = self.config.ttl();
        inner.expiry_timer = Some(tokio::spawn(async move {
            clock.sleep(ttl).await;
            if let Some(lifecycle) = weak.upgrade() {
                lifecycle.expiry_fired(epoch);
            }
        }));
    }

    fn cancel_timers(inner: &mut LifecycleInner) {
        inner.timer_epoch += 1;
        if let Some(handle) = inner.warning_timer.take() {
            handle.abort();
        }
        if let Some(handle) = inner.expiry_timer.take() {
            handle.abort();
        }
    }

    fn warning_fired(&self, epoch: u64) {
        {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            if epoch != inner.timer_epoch
                || matches!(
                    inner.state,
                    LifecycleState::Disarmed | LifecycleState::Expired
                )
            {
                return;
            }
            inner.state = LifecycleState::Warning;
            inner.warning_raised = true;
        }

        info!(lifecycle = %self.id, "Inactivity warning raised");
        let callbacks = self
            .warning_subs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot();
        for callback in callbacks {
            callback();
        }
    }

    fn expiry_fired(&self, epoch: u64) {
        {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            if epoch != inner.timer_epoch
                || matches!(
                    inner.state,
                    LifecycleState::Disarmed | LifecycleState::Expired
                )
            {
                return;
            }
            Self::cancel_timers(&mut inner);
            inner.cache.invalidate();
            inner.warning_raised = false;
            inner.state = LifecycleState::Expired;
        }

        if let Err(e) = self.store.clear() {
            warn!(lifecycle = %self.id, error = %e, "Failed to clear stores on expiry");
        }
        warn!(lifecycle = %self.id, "Session expired after inactivity");

        let callbacks = self
            .expired_subs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot();
        if callbacks.is_empty() {
            error!(lifecycle = %self.id, "No expiry subscriber registered, running fallback");
            let fallback = self
                .expiry_fallback
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(fallback) = fallback {
                fallback();
            }
        } else {
            for callback in callbacks {
                callback();
            }
        }
    }
}

impl Drop for SessionLifecycle {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            Self::cancel_timers(&mut inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::manual::ManualClock;
    use crate::session::StoreConfig;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::tempdir;

    const MIN: u64 = 60;

    fn test_lifecycle() -> (Arc<SessionLifecycle>, Arc<ManualClock>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(
            SessionStore::open(
                StoreConfig {
                    durable_path: dir.path().join("session.redb"),
                    ..StoreConfig::default()
                },
                Arc::clone(&clock) as Arc<dyn Clock>,
            )
            .unwrap(),
        );
        let lifecycle = SessionLifecycle::new(
            store,
            LifecycleConfig::default(),
            Arc::clone(&clock) as Arc<dyn Clock>,
        )
        .unwrap();
        (lifecycle, clock, dir)
    }

    fn login_data() -> SessionData {
        SessionData {
            identity_id: Some("user-1".to_string()),
            profile: Some(json!({"name": "Ada"})),
            access_scope_id: Some("scope-1".to_string()),
            ..Default::default()
        }
    }

    fn counter_callback(counter: &Arc<AtomicUsize>) -> impl Fn() + Send + Sync + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn minutes(clock: &ManualClock, minutes: u64) {
        clock.advance(Duration::from_secs(minutes * MIN)).await;
    }

    #[test]
    fn test_ttl_mismatch_rejected() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(
            SessionStore::open(
                StoreConfig {
                    durable_path: dir.path().join("session.redb"),
                    ttl_secs: 60,
                    ..StoreConfig::default()
                },
                Arc::clone(&clock) as Arc<dyn Clock>,
            )
            .unwrap(),
        );
        let result = SessionLifecycle::new(
            store,
            LifecycleConfig::default(),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_status_tracks_remaining_ttl() {
        let (lifecycle, clock, _dir) = test_lifecycle();
        lifecycle.login(&login_data()).unwrap();

        let status = lifecycle.get_session_status();
        assert!(status.is_valid);
        assert_eq!(status.remaining_ms, 30 * MIN * 1000);

        minutes(&clock, 10).await;
        let status = lifecycle.get_session_status();
        assert!(status.is_valid);
        assert_eq!(status.remaining_ms, 20 * MIN * 1000);
    }

    #[tokio::test]
    async fn test_login_twice_refreshes_ttl() {
        let (lifecycle, clock, _dir) = test_lifecycle();
        let warnings = Arc::new(AtomicUsize::new(0));
        lifecycle.on_warning(counter_callback(&warnings));

        lifecycle.login(&login_data()).unwrap();
        minutes(&clock, 10).await;
        lifecycle.login(&login_data()).unwrap();

        // Full TTL again: not doubled, not shortened.
        let status = lifecycle.get_session_status();
        assert_eq!(status.remaining_ms, 30 * MIN * 1000);

        // Warning timer was re-armed: due 25 minutes after the second login.
        minutes(&clock, 24).await;
        assert_eq!(warnings.load(Ordering::SeqCst), 0);
        minutes(&clock, 1).await;
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_logout_finality() {
        let (lifecycle, _clock, _dir) = test_lifecycle();
        lifecycle.login(&login_data()).unwrap();
        assert!(lifecycle.is_authenticated());

        lifecycle.logout().unwrap();

        assert!(!lifecycle.is_authenticated());
        assert_eq!(lifecycle.state(), LifecycleState::Disarmed);
        for key in SessionKey::ALL {
            assert_eq!(lifecycle.store.get(key, StoreKind::Volatile), None);
            assert_eq!(lifecycle.store.get(key, StoreKind::Durable), None);
        }
        assert_eq!(lifecycle.store.get_flat("identity_id"), None);

        // Redundant logout: quiet no-op, not an error.
        lifecycle.logout().unwrap();
    }

    #[tokio::test]
    async fn test_activity_extends_expiry_but_warning_flag_is_sticky() {
        let (lifecycle, clock, _dir) = test_lifecycle();
        let warnings = Arc::new(AtomicUsize::new(0));
        let expiries = Arc::new(AtomicUsize::new(0));
        lifecycle.on_warning(counter_callback(&warnings));
        lifecycle.on_expired(counter_callback(&expiries));

        lifecycle.login(&login_data()).unwrap();

        minutes(&clock, 26).await;
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
        assert_eq!(lifecycle.state(), LifecycleState::Warning);
        assert!(lifecycle.warning_raised());

        minutes(&clock, 1).await;
        lifecycle.record_activity();

        // Expiry pushed from minute 30 to minute 57, but the raised warning
        // stays raised until an explicit extend.
        minutes(&clock, 18).await; // minute 45
        assert_eq!(expiries.load(Ordering::SeqCst), 0);
        assert!(lifecycle.warning_raised());
    }

    #[tokio::test]
    async fn test_expiry_fires_exactly_once_and_wipes_stores() {
        let (lifecycle, clock, _dir) = test_lifecycle();
        let expiries = Arc::new(AtomicUsize::new(0));
        lifecycle.on_expired(counter_callback(&expiries));

        lifecycle.login(&login_data()).unwrap();

        minutes(&clock, 25).await;
        assert_eq!(expiries.load(Ordering::SeqCst), 0);

        minutes(&clock, 5).await;
        assert_eq!(expiries.load(Ordering::SeqCst), 1);
        assert!(!lifecycle.store.has_any_volatile());
        assert_eq!(lifecycle.store.get_flat("identity_id"), None);
        assert_eq!(lifecycle.state(), LifecycleState::Expired);
        assert_eq!(lifecycle.get_session_status().message, "session expired");

        minutes(&clock, 60).await;
        assert_eq!(expiries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_independent_subscribers_each_fire_once() {
        let (lifecycle, clock, _dir) = test_lifecycle();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let removed = Arc::new(AtomicUsize::new(0));

        lifecycle.on_expired(counter_callback(&first));
        lifecycle.on_expired(counter_callback(&second));
        let handle = lifecycle.on_expired(counter_callback(&removed));
        assert!(lifecycle.unsubscribe_expired(handle));

        lifecycle.login(&login_data()).unwrap();
        minutes(&clock, 30).await;

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(removed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expiry_fallback_runs_without_subscribers() {
        let (lifecycle, clock, _dir) = test_lifecycle();
        let fallback = Arc::new(AtomicUsize::new(0));
        lifecycle.set_expiry_fallback(counter_callback(&fallback));

        lifecycle.login(&login_data()).unwrap();
        minutes(&clock, 30).await;

        assert_eq!(fallback.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_is_authenticated_fast_path_precedes_cache() {
        let (lifecycle, _clock, _dir) = test_lifecycle();
        assert!(!lifecycle.is_authenticated());

        lifecycle.login(&login_data()).unwrap();
        assert!(lifecycle.is_authenticated());

        // Remove every key behind the lifecycle's back: the presence fast
        // path answers before the sticky positive cache can.
        for key in SessionKey::ALL {
            lifecycle.store.remove(key, StoreKind::Volatile).unwrap();
        }
        assert!(!lifecycle.is_authenticated());
    }

    #[tokio::test]
    async fn test_recomputing_validation_counts_as_activity() {
        let (lifecycle, clock, _dir) = test_lifecycle();
        let expiries = Arc::new(AtomicUsize::new(0));
        lifecycle.on_expired(counter_callback(&expiries));

        lifecycle.login(&login_data()).unwrap();
        minutes(&clock, 10).await;

        // Cache was invalidated by login, so this recomputes and resets the
        // timers: expiry moves from minute 30 to minute 40.
        assert!(lifecycle.is_authenticated());

        minutes(&clock, 25).await; // minute 35
        assert_eq!(expiries.load(Ordering::SeqCst), 0);
        minutes(&clock, 5).await; // minute 40
        assert_eq!(expiries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_validation_does_not_count_as_activity() {
        let (lifecycle, clock, _dir) = test_lifecycle();
        let expiries = Arc::new(AtomicUsize::new(0));
        lifecycle.on_expired(counter_callback(&expiries));

        lifecycle.login(&login_data()).unwrap();
        assert!(lifecycle.is_authenticated()); // recompute at minute 0

        minutes(&clock, 10).await;
        // Sticky positive cache: answered without recomputation, timers
        // untouched.
        assert!(lifecycle.is_authenticated());

        minutes(&clock, 20).await; // minute 30
        assert_eq!(expiries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_status_read_does_not_reset_timers() {
        let (lifecycle, clock, _dir) = test_lifecycle();
        let expiries = Arc::new(AtomicUsize::new(0));
        lifecycle.on_expired(counter_callback(&expiries));

        lifecycle.login(&login_data()).unwrap();
        minutes(&clock, 10).await;
        let _ = lifecycle.get_session_status();

        minutes(&clock, 20).await; // minute 30
        assert_eq!(expiries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_extend_clears_warning_and_restamps_records() {
        let (lifecycle, clock, _dir) = test_lifecycle();
        lifecycle.login(&login_data()).unwrap();

        minutes(&clock, 26).await;
        assert!(lifecycle.warning_raised());

        lifecycle.extend_session().unwrap();
        assert!(!lifecycle.warning_raised());
        assert_eq!(lifecycle.state(), LifecycleState::Active);
        assert_eq!(lifecycle.get_session_status().remaining_ms, 30 * MIN * 1000);

        // Records were re-stamped, so the session outlives the original
        // minute-30 deadline.
        minutes(&clock, 20).await; // minute 46
        assert!(lifecycle.get_session_status().is_valid);
    }

    #[tokio::test]
    async fn test_dismiss_clears_flag_but_does_not_extend() {
        let (lifecycle, clock, _dir) = test_lifecycle();
        let expiries = Arc::new(AtomicUsize::new(0));
        lifecycle.on_expired(counter_callback(&expiries));

        lifecycle.login(&login_data()).unwrap();
        minutes(&clock, 26).await;
        assert!(lifecycle.warning_raised());

        lifecycle.dismiss_warning();
        assert!(!lifecycle.warning_raised());
        assert_eq!(lifecycle.state(), LifecycleState::Active);

        // Dismiss is not an extend: expiry still lands at minute 30.
        minutes(&clock, 4).await;
        assert_eq!(expiries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_extend_without_session_is_noop() {
        let (lifecycle, _clock, _dir) = test_lifecycle();
        lifecycle.extend_session().unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Disarmed);
    }

    #[tokio::test]
    async fn test_stop_cancels_timers_without_touching_stores() {
        let (lifecycle, clock, _dir) = test_lifecycle();
        let expiries = Arc::new(AtomicUsize::new(0));
        lifecycle.on_expired(counter_callback(&expiries));

        lifecycle.login(&login_data()).unwrap();
        lifecycle.stop();

        minutes(&clock, 40).await;
        assert_eq!(expiries.load(Ordering::SeqCst), 0);
        // The stores were left alone.
        assert_eq!(lifecycle.store.get_flat("identity_id"), Some(json!("user-1")));
    }

    #[tokio::test]
    async fn test_shutdown_clears_volatile_only() {
        let (lifecycle, _clock, _dir) = test_lifecycle();
        lifecycle.login(&login_data()).unwrap();

        lifecycle.shutdown();

        assert!(!lifecycle.store.has_any_volatile());
        // Durable rehydration values survive for the next start.
        assert_eq!(lifecycle.store.get_flat("identity_id"), Some(json!("user-1")));
        assert_eq!(lifecycle.state(), LifecycleState::Disarmed);
    }
}
