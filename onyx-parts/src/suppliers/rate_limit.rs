//! Sliding-window request limiter, one window per supplier.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use super::SupplierKind;

pub const DEFAULT_MAX_REQUESTS: usize = 10;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    requests: HashMap<SupplierKind, VecDeque<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        tracing::debug!(
            "RateLimiter initialized: {} requests per {:?}",
            max_requests,
            window
        );
        Self {
            max_requests,
            window,
            requests: HashMap::new(),
        }
    }

    /// Record a request for `kind` if the window has room.
    pub fn allow_request(&mut self, kind: SupplierKind) -> bool {
        self.allow_request_at(kind, Instant::now())
    }

    pub fn allow_request_at(&mut self, kind: SupplierKind, now: Instant) -> bool {
        let window = self.window;
        let max_requests = self.max_requests;
        let history = self.requests.entry(kind).or_default();
        Self::expire(history, now, window);

        if history.len() >= max_requests {
            tracing::warn!("Rate limit exceeded for {}", kind);
            return false;
        }
        history.push_back(now);
        true
    }

    /// Time until `kind` may send again; zero if it may send now.
    pub fn wait_time(&mut self, kind: SupplierKind) -> Duration {
        self.wait_time_at(kind, Instant::now())
    }

    pub fn wait_time_at(&mut self, kind: SupplierKind, now: Instant) -> Duration {
        let window = self.window;
        let Some(history) = self.requests.get_mut(&kind) else {
            return Duration::ZERO;
        };
        Self::expire(history, now, window);

        if history.len() < self.max_requests {
            return Duration::ZERO;
        }
        history
            .front()
            .map(|oldest| (*oldest + window).saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    fn expire(history: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(oldest) = history.front() {
            if now.saturating_duration_since(*oldest) >= window {
                history.pop_front();
            } else {
                break;
            }
        }
    }
}
