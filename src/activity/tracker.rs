//! User-interaction reporting.
//!
//! The embedding shell reports raw interaction signals here; each one is
//! forwarded to the lifecycle as "activity occurred". No debouncing or
//! coalescing: the lifecycle's activity handler only clears and re-arms two
//! timer handles, so per-signal forwarding stays O(1) even at pointer-move
//! frequency.

use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::debug;

use crate::lifecycle::SessionLifecycle;

/// Interaction signals the shell listens for at the document root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionSignal {
    PointerDown,
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
    Click,
}

impl InteractionSignal {
    pub const ALL: [InteractionSignal; 6] = [
        InteractionSignal::PointerDown,
        InteractionSignal::PointerMove,
        InteractionSignal::KeyPress,
        InteractionSignal::Scroll,
        InteractionSignal::TouchStart,
        InteractionSignal::Click,
    ];
}

/// Channel capacity for queued signals.
const CHANNEL_CAPACITY: usize = 1024;

/// Forwards interaction signals into the session lifecycle.
pub struct ActivityTracker {
    tx: mpsc::Sender<InteractionSignal>,
}

impl ActivityTracker {
    /// Create a tracker and spawn the forwarding task.
    ///
    /// The task holds only a weak reference to the lifecycle: dropping the
    /// lifecycle ends forwarding instead of being kept alive by it.
    pub fn new(lifecycle: &Arc<SessionLifecycle>) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(forward_loop(Arc::downgrade(lifecycle), rx));
        Self { tx }
    }

    /// Report an interaction signal (non-blocking, fire-and-forget).
    ///
    /// Drops the signal when the channel is full; the activity handler is
    /// idempotent, so the next signal re-arms the same timers.
    pub fn record(&self, signal: InteractionSignal) {
        let _ = self.tx.try_send(signal);
    }
}

async fn forward_loop(lifecycle: Weak<SessionLifecycle>, mut rx: mpsc::Receiver<InteractionSignal>) {
    while let Some(_signal) = rx.recv().await {
        let Some(lifecycle) = lifecycle.upgrade() else {
            debug!("Lifecycle gone, stopping activity forwarding");
            break;
        };
        lifecycle.record_activity();
    }
}
