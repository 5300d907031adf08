//! Ordered subscriber registry for lifecycle notifications.
//!
//! Replaces a replace-on-reregister callback slot: independent consumers get
//! their own [`Subscription`] handle and cannot clobber each other.

use std::sync::Arc;

/// Handle returned by a subscribe call; pass back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Subscribers in registration order.
#[derive(Default)]
pub struct SubscriberSet {
    next_id: u64,
    entries: Vec<(u64, Callback)>,
}

impl SubscriberSet {
    pub fn subscribe(&mut self, callback: Callback) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, callback));
        Subscription(id)
    }

    /// Remove a subscriber. Returns false when the handle is already gone.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(id, _)| *id != subscription.0);
        self.entries.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot the callbacks so they can be invoked without holding the
    /// registry lock (a subscriber may call back into the lifecycle).
    pub fn snapshot(&self) -> Vec<Callback> {
        self.entries.iter().map(|(_, cb)| Arc::clone(cb)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_callback(counter: &Arc<AtomicUsize>) -> Callback {
        let counter = Arc::clone(counter);
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_all_subscribers_invoked_in_order() {
        let mut set = SubscriberSet::default();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let order = Arc::clone(&order);
            set.subscribe(Arc::new(move || {
                order.lock().unwrap().push(tag);
            }));
        }

        for callback in set.snapshot() {
            callback();
        }
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_unsubscribed_handle_not_invoked() {
        let mut set = SubscriberSet::default();
        let kept = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicUsize::new(0));

        set.subscribe(counter_callback(&kept));
        let handle = set.subscribe(counter_callback(&dropped));

        assert!(set.unsubscribe(handle));
        assert!(!set.unsubscribe(handle));

        for callback in set.snapshot() {
            callback();
        }
        assert_eq!(kept.load(Ordering::SeqCst), 1);
        assert_eq!(dropped.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_is_empty() {
        let mut set = SubscriberSet::default();
        assert!(set.is_empty());
        let handle = set.subscribe(Arc::new(|| {}));
        assert!(!set.is_empty());
        set.unsubscribe(handle);
        assert!(set.is_empty());
    }
}
