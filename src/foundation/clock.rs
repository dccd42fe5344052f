//! Millisecond time sources for the live preview and for paced export.

use std::time::{Duration, Instant};

pub trait Clock {
    /// Monotonic milliseconds since an arbitrary, fixed epoch.
    fn now_ms(&self) -> f64;

    fn sleep_ms(&mut self, ms: f64);
}

/// Wall clock backed by [`Instant`].
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    fn sleep_ms(&mut self, ms: f64) {
        if ms.is_finite() && ms > 0.0 {
            std::thread::sleep(Duration::from_secs_f64(ms / 1000.0));
        }
    }
}

/// Clock that only moves when told to. Sleeping advances it instantly.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ManualClock {
    now_ms: f64,
}

impl ManualClock {
    pub fn at(now_ms: f64) -> Self {
        Self { now_ms }
    }

    pub fn set(&mut self, now_ms: f64) {
        self.now_ms = now_ms;
    }

    pub fn advance(&mut self, ms: f64) {
        self.now_ms += ms;
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now_ms
    }

    fn sleep_ms(&mut self, ms: f64) {
        if ms > 0.0 {
            self.now_ms += ms;
        }
    }
}
