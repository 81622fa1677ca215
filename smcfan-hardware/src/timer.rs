//! Monotonic clock and busy-wait delay used by the protocol driver

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Time source for status polling
pub trait Timer: Send {
    /// Monotonic time since an arbitrary origin
    fn now(&self) -> Duration;

    /// Block for `duration`
    fn stall(&mut self, duration: Duration);
}

impl<C: Timer + ?Sized> Timer for Box<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn stall(&mut self, duration: Duration) {
        (**self).stall(duration)
    }
}

/// Wall-clock timer
///
/// Sub-millisecond stalls spin on the clock; `thread::sleep` granularity is too
/// coarse for 10 µs port delays.
#[derive(Debug, Clone)]
pub struct StdTimer {
    origin: Instant,
}

impl StdTimer {
    const SPIN_LIMIT: Duration = Duration::from_millis(1);

    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for StdTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for StdTimer {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn stall(&mut self, duration: Duration) {
        if duration >= Self::SPIN_LIMIT {
            std::thread::sleep(duration);
            return;
        }
        let end = Instant::now() + duration;
        while Instant::now() < end {
            std::hint::spin_loop();
        }
    }
}

/// Virtual timer: time only moves when something stalls
///
/// Clones share the same clock, so a test can observe how much time the driver
/// spent waiting.
#[derive(Debug, Clone, Default)]
pub struct VirtualTimer {
    nanos: Arc<AtomicU64>,
}

impl VirtualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total virtual time elapsed
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }

    /// Move the clock forward without stalling
    pub fn advance(&self, duration: Duration) {
        self.nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Timer for VirtualTimer {
    fn now(&self) -> Duration {
        self.elapsed()
    }

    fn stall(&mut self, duration: Duration) {
        self.advance(duration);
    }
}
