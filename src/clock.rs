//! Time source abstraction.
//!
//! Every timer in this crate (warning/expiry, status poller, push debounce)
//! sleeps through a [`Clock`] so tests can drive them with virtual time
//! instead of waiting on the wall clock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Injectable time source: wall-clock reads plus cancellable sleeps.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;

    /// Sleep for `duration` according to this clock's notion of time.
    ///
    /// Cancellation happens by dropping the future (timer tasks are aborted),
    /// so implementations must not hold locks across the await point.
    async fn sleep(&self, duration: Duration);
}

/// Production clock: chrono wall time and tokio timers.
#[derive(Debug, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
