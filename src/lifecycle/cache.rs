//! Validation result cache.
//!
//! One cached result, global to the lifecycle (not per key), bounding the
//! cost of repeated `is_authenticated` calls. A positive result is sticky
//! until a state-changing operation invalidates it, so the answer cannot
//! flicker to `false` right after login before the first full validation. A
//! negative result is only trusted for a short window before recomputation.

use chrono::{DateTime, Utc};

/// Cached outcome of the last full validation.
#[derive(Debug, Default)]
pub struct ValidationCache {
    entry: Option<CacheEntry>,
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    result: bool,
    computed_at: DateTime<Utc>,
}

impl ValidationCache {
    /// Return the cached result when it is still trustworthy.
    pub fn lookup(&self, now: DateTime<Utc>, negative_window: chrono::Duration) -> Option<bool> {
        match self.entry {
            Some(CacheEntry { result: true, .. }) => Some(true),
            Some(CacheEntry {
                result: false,
                computed_at,
            }) if now - computed_at <= negative_window => Some(false),
            _ => None,
        }
    }

    pub fn store(&mut self, result: bool, now: DateTime<Utc>) {
        self.entry = Some(CacheEntry {
            result,
            computed_at: now,
        });
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: i64 = 5_000;

    fn window() -> chrono::Duration {
        chrono::Duration::milliseconds(WINDOW)
    }

    #[test]
    fn test_empty_cache_misses() {
        let cache = ValidationCache::default();
        assert_eq!(cache.lookup(Utc::now(), window()), None);
    }

    #[test]
    fn test_positive_result_is_sticky() {
        let now = Utc::now();
        let mut cache = ValidationCache::default();
        cache.store(true, now);

        // Trusted far beyond the negative window, until invalidated.
        let much_later = now + chrono::Duration::hours(2);
        assert_eq!(cache.lookup(much_later, window()), Some(true));

        cache.invalidate();
        assert_eq!(cache.lookup(much_later, window()), None);
    }

    #[test]
    fn test_negative_result_expires_after_window() {
        let now = Utc::now();
        let mut cache = ValidationCache::default();
        cache.store(false, now);

        assert_eq!(
            cache.lookup(now + chrono::Duration::milliseconds(WINDOW - 1), window()),
            Some(false)
        );
        assert_eq!(
            cache.lookup(now + chrono::Duration::milliseconds(WINDOW + 1), window()),
            None
        );
    }
}
