//! Frame-driven interval timers for polling and heartbeats.

#[cfg(not(target_arch = "wasm32"))]
pub use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

#[cfg(target_arch = "wasm32")]
pub use web_time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Current time in Unix seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// A fixed-interval timer driven by the host's frame clock.
///
/// The host calls [`IntervalTimer::fire_if_due`] with the current time; the
/// timer reports whether its interval has elapsed since the last firing.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    interval: Duration,
    next_due: Option<Instant>,
    cancelled: bool,
}

impl IntervalTimer {
    /// Create a stopped timer.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
            cancelled: false,
        }
    }

    /// Get the interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the timer; it first fires one interval after `now`.
    /// Has no effect once cancelled.
    pub fn start(&mut self, now: Instant) {
        if !self.cancelled {
            self.next_due = Some(now + self.interval);
        }
    }

    /// Check whether the timer is running.
    pub fn is_running(&self) -> bool {
        self.next_due.is_some() && !self.cancelled
    }

    /// Check whether the timer would fire at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        !self.cancelled && self.next_due.is_some_and(|due| now >= due)
    }

    /// Fire if due, scheduling the next firing one interval after `now`.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.next_due = Some(now + self.interval);
        true
    }

    /// Stop the timer for good.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.next_due = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}
