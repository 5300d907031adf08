//! Orchestration between the shell's navigation/auth state and the lifecycle.
//!
//! The bridge decides, per navigational context, whether session tracking is
//! armed; mirrors lifecycle notifications into the authoritative auth state;
//! polls status for countdown display; and pushes authoritative-state changes
//! into the lifecycle, debounced and fingerprint-deduplicated.

use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::BridgeConfig;
use super::fingerprint::{AuthFingerprint, AuthSnapshot};
use crate::clock::Clock;
use crate::lifecycle::{SessionLifecycle, Subscription};
use crate::session::{LoginKind, SessionStore};

/// Effects the bridge produces into the shell's authoritative state.
pub trait AuthStateSink: Send + Sync {
    /// Clear the authoritative auth state (the session ended).
    fn clear_auth(&self);

    /// Navigate the shell to `path`.
    fn navigate(&self, path: &str);

    /// Surface the inactivity warning with the remaining session time.
    fn warning(&self, remaining_ms: u64);

    /// Periodic countdown update while armed.
    fn countdown(&self, remaining_ms: u64);
}

/// The triple that drives arming decisions. Transitions are evaluated only
/// when it changes; unrelated re-renders are no-ops.
type RouteTriple = (String, bool, Option<LoginKind>);

struct BridgeInner {
    armed: bool,
    last_triple: Option<RouteTriple>,
    /// Fingerprint of the last snapshot actually pushed into the lifecycle.
    last_pushed: Option<AuthFingerprint>,
    /// Fingerprint of a scheduled-but-not-yet-executed push.
    pending_push: Option<AuthFingerprint>,
    poll_epoch: u64,
    poller: Option<JoinHandle<()>>,
    push_epoch: u64,
    push_task: Option<JoinHandle<()>>,
}

/// Armed/disarmed orchestration layer over a [`SessionLifecycle`].
pub struct SyncBridge {
    lifecycle: Arc<SessionLifecycle>,
    store: Arc<SessionStore>,
    sink: Arc<dyn AuthStateSink>,
    config: BridgeConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<BridgeInner>,
    warning_sub: Subscription,
    expired_sub: Subscription,
}

impl SyncBridge {
    /// Create a bridge and register its lifecycle subscribers.
    ///
    /// Subscribers are registered exactly once here, not on arm, so repeated
    /// arm/disarm cycles cannot stack registrations; the armed flag gates
    /// their effect instead.
    pub fn new(
        lifecycle: Arc<SessionLifecycle>,
        store: Arc<SessionStore>,
        sink: Arc<dyn AuthStateSink>,
        config: BridgeConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>> {
        config.validate().map_err(|e| anyhow!(e))?;

        Ok(Arc::new_cyclic(|weak: &Weak<SyncBridge>| {
            let warning_sub = {
                let weak = weak.clone();
                lifecycle.on_warning(move || {
                    if let Some(bridge) = weak.upgrade() {
                        bridge.handle_warning();
                    }
                })
            };
            let expired_sub = {
                let weak = weak.clone();
                lifecycle.on_expired(move || {
                    if let Some(bridge) = weak.upgrade() {
                        bridge.handle_expired();
                    }
                })
            };

            SyncBridge {
                lifecycle,
                store,
                sink,
                config,
                clock,
                inner: Mutex::new(BridgeInner {
                    armed: false,
                    last_triple: None,
                    last_pushed: None,
                    pending_push: None,
                    poll_epoch: 0,
                    poller: None,
                    push_epoch: 0,
                    push_task: None,
                }),
                warning_sub,
                expired_sub,
            }
        }))
    }

    /// Feed the current navigational context and authoritative auth state.
    ///
    /// Called by the shell on every render/navigation; cheap when nothing
    /// relevant changed.
    pub fn observe(self: &Arc<Self>, path: &str, snapshot: &AuthSnapshot) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };

        let triple: RouteTriple = (
            path.to_string(),
            snapshot.is_authenticated,
            snapshot.login_kind,
        );
        if inner.last_triple.as_ref() != Some(&triple) {
            inner.last_triple = Some(triple);

            if self.config.is_passive(path) {
                // Tracking must not run before a user has chosen a login
                // path, regardless of authentication state.
                self.disarm_locked(&mut inner, "passive path");
            } else if snapshot.is_authenticated {
                self.arm_locked(&mut inner);
            } else {
                self.disarm_locked(&mut inner, "not authenticated");
            }
        }

        if inner.armed && snapshot.is_authenticated {
            let fingerprint = AuthFingerprint::of(snapshot);
            if inner.last_pushed.as_ref() != Some(&fingerprint)
                && inner.pending_push.as_ref() != Some(&fingerprint)
            {
                self.schedule_push_locked(&mut inner, snapshot.clone());
            }
        }
    }

    /// Whether session tracking is currently armed.
    pub fn is_armed(&self) -> bool {
        self.inner.lock().map(|inner| inner.armed).unwrap_or(false)
    }

    /// Cancel poller and pending push without logging out (consumer
    /// teardown). Cascades into the lifecycle's own timer teardown.
    pub fn stop(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.armed = false;
            inner.pending_push = None;
            Self::cancel_tasks_locked(&mut inner);
        }
        self.lifecycle.stop();
    }

    fn arm_locked(self: &Arc<Self>, inner: &mut BridgeInner) {
        if inner.armed {
            return;
        }
        inner.armed = true;
        self.spawn_poller_locked(inner);
        debug!("Session tracking armed");
    }

    fn disarm_locked(&self, inner: &mut BridgeInner, reason: &str) {
        if !inner.armed {
            return;
        }
        inner.armed = false;
        inner.last_pushed = None;
        inner.pending_push = None;
        Self::cancel_tasks_locked(inner);

        if let Err(e) = self.lifecycle.logout() {
            warn!(error = %e, "Failed to log lifecycle out on disarm");
        }
        debug!(reason, "Session tracking disarmed");
    }

    fn cancel_tasks_locked(inner: &mut BridgeInner) {
        inner.poll_epoch += 1;
        if let Some(handle) = inner.poller.take() {
            handle.abort();
        }
        inner.push_epoch += 1;
        if let Some(handle) = inner.push_task.take() {
            handle.abort();
        }
    }

    fn spawn_poller_locked(self: &Arc<Self>, inner: &mut BridgeInner) {
        inner.poll_epoch += 1;
        let epoch = inner.poll_epoch;
        if let Some(handle) = inner.poller.take() {
            handle.abort();
        }

        let weak = Arc::downgrade(self);
        let clock = Arc::clone(&self.clock);
        let interval = self.config.poll_interval();
        inner.poller = Some(tokio::spawn(async move {
            loop {
                clock.sleep(interval).await;
                let Some(bridge) = weak.upgrade() else {
                    break;
                };
                if !bridge.poll_tick(epoch) {
                    break;
                }
            }
        }));
    }

    /// One poller round. Returns false when the poller should stop.
    fn poll_tick(&self, epoch: u64) -> bool {
        {
            let Ok(inner) = self.inner.lock() else {
                return false;
            };
            if epoch != inner.poll_epoch || !inner.armed {
                return false;
            }
        }

        let status = self.lifecycle.get_session_status();
        if status.is_valid {
            self.sink.countdown(status.remaining_ms);
            return true;
        }

        // Externally invalidated (tampering, out-of-band wipe): force logout.
        warn!(message = %status.message, "Session no longer valid, forcing logout");
        {
            let Ok(mut inner) = self.inner.lock() else {
                return false;
            };
            self.disarm_locked(&mut inner, "status invalid");
        }
        self.sink.clear_auth();
        self.sink.navigate(&self.config.login_path);
        false
    }

    fn schedule_push_locked(self: &Arc<Self>, inner: &mut BridgeInner, snapshot: AuthSnapshot) {
        inner.push_epoch += 1;
        let epoch = inner.push_epoch;
        if let Some(handle) = inner.push_task.take() {
            handle.abort();
        }
        inner.pending_push = Some(AuthFingerprint::of(&snapshot));

        let weak = Arc::downgrade(self);
        let clock = Arc::clone(&self.clock);
        let debounce = self.config.push_debounce();
        inner.push_task = Some(tokio::spawn(async move {
            clock.sleep(debounce).await;
            if let Some(bridge) = weak.upgrade() {
                bridge.push_now(epoch, snapshot);
            }
        }));
    }

    /// Execute a debounced push: `login` on an identity change, `extend`
    /// otherwise.
    fn push_now(&self, epoch: u64, snapshot: AuthSnapshot) {
        let is_login = {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            if epoch != inner.push_epoch || !inner.armed {
                return;
            }
            let fingerprint = AuthFingerprint::of(&snapshot);
            let is_login = match &inner.last_pushed {
                None => true,
                Some(previous) => !previous.same_identity(&fingerprint),
            };
            inner.last_pushed = Some(fingerprint);
            inner.pending_push = None;
            is_login
        };

        if let Some(kind) = snapshot.login_kind {
            match serde_json::to_value(kind) {
                Ok(value) => {
                    if let Err(e) = self.store.set_flat("login_kind", &value) {
                        warn!(error = %e, "Failed to mirror login kind");
                    }
                }
                Err(e) => warn!(error = %e, "Failed to serialize login kind"),
            }
        }

        let result = if is_login {
            self.lifecycle.login(&snapshot.session_data())
        } else {
            self.lifecycle.extend_session()
        };
        match result {
            Ok(()) => debug!(login = is_login, "Pushed authoritative state into lifecycle"),
            Err(e) => warn!(error = %e, "Failed to push authoritative state into lifecycle"),
        }
    }

    fn handle_warning(&self) {
        {
            let Ok(inner) = self.inner.lock() else {
                return;
            };
            if !inner.armed {
                return;
            }
        }
        let status = self.lifecycle.get_session_status();
        self.sink.warning(status.remaining_ms);
    }

    fn handle_expired(&self) {
        {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            if !inner.armed {
                return;
            }
            self.disarm_locked(&mut inner, "session expired");
        }
        self.sink.clear_auth();
        self.sink.navigate(&self.config.login_path);
        info!("Session expiry mirrored into authoritative state");
    }
}

impl Drop for SyncBridge {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            Self::cancel_tasks_locked(&mut inner);
        }
        self.lifecycle.unsubscribe_warning(self.warning_sub);
        self.lifecycle.unsubscribe_expired(self.expired_sub);
    }
}
