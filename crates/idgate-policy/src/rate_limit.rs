//! Fixed-window rate limiting keyed by client address.

use crate::errors::{PolicyError, Result};
use crate::types::{RateLimit, RateLimitRule};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

const MAX_ENTRIES: usize = 10_000;

/// In-memory fixed-window limiter.
///
/// Each key gets `max_requests` admissions per window; the window starts at
/// the first request and resets once it has fully elapsed. The table is
/// swept of expired windows when it grows past `MAX_ENTRIES`, and the least
/// recently seen keys are evicted if that is not enough.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    max_entries: usize,
}

#[derive(Debug, Clone)]
struct Window {
    count: u32,
    started_at: u64,
    window_seconds: u64,
    last_seen: u64,
}

impl Window {
    fn resets_at(&self) -> u64 {
        self.started_at.saturating_add(self.window_seconds)
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_capacity(MAX_ENTRIES)
    }

    fn with_capacity(max_entries: usize) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Window>> {
        // A poisoned table only holds counters; keep serving
        self.windows.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Admit or reject one request for `key` at time `now`.
    ///
    /// Rejected requests do not extend the window.
    pub fn check(&self, key: &str, rule: &RateLimitRule, now: u64) -> Result<RateLimit> {
        let mut windows = self.lock();

        let outcome = {
            let window = windows.entry(key.to_string()).or_insert(Window {
                count: 0,
                started_at: now,
                window_seconds: rule.window_seconds,
                last_seen: now,
            });

            if now >= window.resets_at() {
                window.count = 0;
                window.started_at = now;
                window.window_seconds = rule.window_seconds;
            }
            window.last_seen = now;

            if window.count >= rule.max_requests {
                let reset_at = window.resets_at();
                tracing::debug!(count = window.count, reset_at, "Rate limit window exhausted");
                Err(PolicyError::RateLimited {
                    limit: rule.max_requests,
                    reset_at,
                    retry_after: reset_at.saturating_sub(now).max(1),
                })
            } else {
                window.count += 1;
                Ok(RateLimit {
                    limit: rule.max_requests,
                    remaining: rule.max_requests - window.count,
                    reset_at: window.resets_at(),
                })
            }
        };

        sweep(&mut windows, now, self.max_entries);

        outcome
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn sweep(windows: &mut HashMap<String, Window>, now: u64, max_entries: usize) {
    if windows.len() <= max_entries {
        return;
    }

    windows.retain(|_, window| now < window.resets_at());

    while windows.len() > max_entries {
        let oldest = windows
            .iter()
            .min_by_key(|(_, window)| window.last_seen)
            .map(|(key, _)| key.clone());
        match oldest {
            Some(key) => {
                windows.remove(&key);
            }
            None => break,
        }
    }
}
