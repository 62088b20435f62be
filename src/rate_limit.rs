//! Request pacing: sliding-window quota plus minimum spacing.
//!
//! Two constraints are enforced simultaneously:
//! - at most `floor(rate * window)` permits in any trailing `window` seconds;
//! - at least `1 / rate` seconds between consecutive permits.
//!
//! The quota alone does not stop bursts faster than `1/rate`, and the spacing
//! alone does not bound the trailing window, so both checks run on every
//! acquisition.
//!
//! Invariants:
//! - The grant log holds at most `max_in_window` timestamps, oldest first,
//!   all within the trailing window after each eviction pass.
//! - `acquire` never fails; it suspends until a permit is granted.
//!
//! The whole check-and-update sequence runs under one async mutex, and waits
//! happen while the lock is held, so concurrent callers are fully serialized.
//! This caps the issue rate at the configured limit even when callers could
//! otherwise overlap their waits; the simplicity is intentional.

use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};
use tracing::debug;

/// Paces calls against a provider-imposed rate limit.
#[derive(Debug)]
pub struct RateLimiter {
    rate: f64,
    window_secs: u64,
    window: Duration,
    min_interval: Duration,
    max_in_window: usize,
    state: Mutex<LimiterState>,
}

#[derive(Debug)]
struct LimiterState {
    last_grant: Option<Instant>,
    log: VecDeque<Instant>,
}

/// Read-only snapshot of limiter state, for observability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateLimiterStats {
    pub rate: f64,
    pub window_secs: u64,
    pub requests_in_window: usize,
    pub max_requests: usize,
    pub min_interval: Duration,
}

impl RateLimiter {
    /// Create a limiter allowing `rate` requests per second, tracked over a
    /// trailing `window_secs` window.
    ///
    /// A non-positive `rate` disables the spacing constraint (the window
    /// quota still applies). That is a defensive mode, not a supported
    /// configuration; [`crate::ClientConfig::validate`] rejects it.
    pub fn new(rate: f64, window_secs: u64) -> Self {
        let min_interval = if rate > 0.0 {
            Duration::try_from_secs_f64(1.0 / rate).unwrap_or(Duration::ZERO)
        } else {
            Duration::ZERO
        };
        // A product below one permit would wedge every caller forever; clamp
        // to a single permit per window.
        let max_in_window = ((rate * window_secs as f64).floor() as usize).max(1);
        Self {
            rate,
            window_secs,
            window: Duration::from_secs(window_secs),
            min_interval,
            max_in_window,
            state: Mutex::new(LimiterState {
                last_grant: None,
                // Pre-allocation is a hint; the real bound is max_in_window.
                log: VecDeque::with_capacity(max_in_window.min(1024)),
            }),
        }
    }

    /// Acquire permission to make a request, suspending as long as either
    /// constraint requires.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;
        let mut now = Instant::now();

        Self::evict(&mut state.log, now, self.window);

        if state.log.len() >= self.max_in_window {
            if let Some(&oldest) = state.log.front() {
                let wait = (oldest + self.window).saturating_duration_since(now);
                if !wait.is_zero() {
                    debug!(
                        wait_secs = wait.as_secs_f64(),
                        rate = self.rate,
                        "rate limit window full, waiting"
                    );
                    sleep(wait).await;
                    now = Instant::now();
                }
            }
        }

        if let Some(last) = state.last_grant {
            let since_last = now.saturating_duration_since(last);
            if since_last < self.min_interval {
                let wait = self.min_interval - since_last;
                debug!(wait_secs = wait.as_secs_f64(), "enforcing minimum interval");
                sleep(wait).await;
                now = Instant::now();
            }
        }

        Self::evict(&mut state.log, now, self.window);
        while state.log.len() >= self.max_in_window {
            state.log.pop_front();
        }
        state.log.push_back(now);
        state.last_grant = Some(now);
    }

    /// Snapshot of the limiter's current state. Pure read; calling it twice
    /// with no intervening `acquire` returns identical values.
    pub async fn stats(&self) -> RateLimiterStats {
        let state = self.state.lock().await;
        let now = Instant::now();
        let requests_in_window = state
            .log
            .iter()
            .filter(|t| now.saturating_duration_since(**t) <= self.window)
            .count();
        RateLimiterStats {
            rate: self.rate,
            window_secs: self.window_secs,
            requests_in_window,
            max_requests: self.max_in_window,
            min_interval: self.min_interval,
        }
    }

    fn evict(log: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(front) = log.front() {
            if now.saturating_duration_since(*front) > window {
                log.pop_front();
            } else {
                break;
            }
        }
    }
}
