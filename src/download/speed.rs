//! Windowed throughput estimation.
//!
//! Progress events arrive in bursts, so an instantaneous rate is mostly noise.
//! The sampler only recomputes the speed once at least one window has elapsed
//! since the previous sample and keeps the last value in between.

use std::time::Duration;
use tokio::time::Instant;

/// Default length of a sampling window.
pub const DEFAULT_SPEED_WINDOW: Duration = Duration::from_millis(1000);

/// Smoothed bytes/sec estimate for one transfer.
#[derive(Debug, Clone)]
pub struct SpeedSampler {
    window: Duration,
    prev_received: u64,
    prev_at: Instant,
    speed: u64,
}

impl SpeedSampler {
    /// Starts sampling from `received` bytes at `now`.
    pub fn new(received: u64, now: Instant, window: Duration) -> Self {
        Self {
            window,
            prev_received: received,
            prev_at: now,
            speed: 0,
        }
    }

    /// Feeds a progress observation.
    ///
    /// Returns `true` when the speed was recomputed.
    pub fn sample(&mut self, received: u64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.prev_at);
        if elapsed < self.window || elapsed.is_zero() {
            return false;
        }
        let delta = received.saturating_sub(self.prev_received) as f64;
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        self.speed = (delta / elapsed_ms * 1000.0).round() as u64;
        self.prev_received = received;
        self.prev_at = now;
        true
    }

    /// Last computed speed in bytes per second.
    pub fn speed(&self) -> u64 {
        self.speed
    }
}
