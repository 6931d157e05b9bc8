//! Sliding-window rate limiter
//!
//! Tracks operation start times per key and admits a new operation only when
//! fewer than `max_requests` started within the trailing window. Over-limit
//! calls fail immediately, there is no queuing.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::hash::Hash;

pub struct RateLimiter<K: Eq + Hash> {
    max_requests: usize,
    window: Duration,
    history: DashMap<K, VecDeque<DateTime<Utc>>>,
}

impl<K: Eq + Hash + Clone> RateLimiter<K> {
    pub fn new(max_requests: usize, window: std::time::Duration) -> Self {
        Self {
            max_requests,
            window: Duration::from_std(window).unwrap_or(Duration::seconds(1)),
            history: DashMap::new(),
        }
    }

    /// Record the operation if admitted; `false` means over the limit
    pub fn try_acquire(&self, key: K) -> bool {
        self.try_acquire_at(key, Utc::now())
    }

    pub fn try_acquire_at(&self, key: K, now: DateTime<Utc>) -> bool {
        let mut entry = self.history.entry(key).or_default();
        let cutoff = now - self.window;
        while entry.front().is_some_and(|t| *t <= cutoff) {
            entry.pop_front();
        }

        if entry.len() >= self.max_requests {
            return false;
        }
        entry.push_back(now);
        true
    }

    /// Operations currently counted for the key
    pub fn in_window(&self, key: &K) -> usize {
        self.in_window_at(key, Utc::now())
    }

    pub fn in_window_at(&self, key: &K, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.window;
        self.history
            .get(key)
            .map(|q| q.iter().filter(|t| **t > cutoff).count())
            .unwrap_or(0)
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }
}
