//! Fixed-window rate limiting for outbound model calls.
//!
//! A window of fixed duration holds a counter that resets when the current
//! time crosses the window boundary. Exactly `limit` acquisitions succeed
//! per window; the `limit+1`-th is denied without side effect. The
//! well-known boundary-burst property of fixed windows (up to 2x the limit
//! across an edge) is accepted here.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

/// Outcome of a [`FixedWindowLimiter::try_acquire`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// The call may proceed; the window counter was incremented.
    Allowed,
    /// The window is exhausted. `retry_after` is the time until it resets.
    Denied { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

struct WindowState {
    started_at: Instant,
    count: u32,
}

/// Fixed-window counter limiting outbound external calls.
///
/// Shared across sessions; the check-and-increment is atomic under an
/// internal mutex so concurrent requests cannot under- or over-count.
pub struct FixedWindowLimiter {
    window: Duration,
    limit: u32,
    state: Mutex<WindowState>,
}

impl FixedWindowLimiter {
    /// Create a limiter allowing `limit` calls per `window`.
    ///
    /// `limit` is clamped to a minimum of 1 and `window` to a minimum of
    /// one millisecond so a zero-valued config cannot wedge the gateway.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            window: window.max(Duration::from_millis(1)),
            limit: limit.max(1),
            state: Mutex::new(WindowState {
                started_at: Instant::now(),
                count: 0,
            }),
        }
    }

    /// Check the current window and claim a slot if one is available.
    ///
    /// Rolls the window over first when it has elapsed, then increments and
    /// allows while under the limit. Denial leaves the counter untouched.
    pub fn try_acquire(&self) -> RateDecision {
        let now = Instant::now();
        let mut state = self.state.lock().expect("limiter state lock poisoned");

        let elapsed = now.duration_since(state.started_at);
        if elapsed >= self.window {
            state.started_at = now;
            state.count = 0;
        }

        if state.count < self.limit {
            state.count += 1;
            RateDecision::Allowed
        } else {
            let retry_after = self.window.saturating_sub(now.duration_since(state.started_at));
            debug!(
                limit = self.limit,
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limit window exhausted"
            );
            RateDecision::Denied { retry_after }
        }
    }

    /// Slots still available in the current window (0 when exhausted).
    pub fn remaining(&self) -> u32 {
        let state = self.state.lock().expect("limiter state lock poisoned");
        if state.started_at.elapsed() >= self.window {
            self.limit
        } else {
            self.limit.saturating_sub(state.count)
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
