//! A small, injectable notion of "now" shared by every component that needs to reason
//! about elapsed time (APQ circuit reset, DLQ retention, ADM cooldown).
//!
//! Components take `Arc<dyn Clock>` rather than calling `Instant::now()` directly so
//! that cooldown/retention/reset-timeout behavior can be exercised in tests without
//! sleeping in real time.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

mod cancel;

pub use cancel::CancellationToken;

/// Source of monotonic and wall-clock time for the pipeline.
pub trait Clock: Send + Sync {
    /// Monotonic instant, used for cooldowns, reset timeouts and rate limiting.
    fn now(&self) -> Instant;

    /// Wall-clock nanoseconds since the Unix epoch, used for record timestamps and
    /// segment file names.
    fn now_unix_nanos(&self) -> u64;
}

/// The real clock, backed by `std::time`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_unix_nanos(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64
    }
}

/// A clock that only advances when told to, for deterministic tests of cooldowns and
/// retention sweeps.
pub struct TestClock {
    base: Instant,
    offset_nanos: AtomicU64,
    unix_base_nanos: u64,
}

impl TestClock {
    /// Creates a test clock anchored at the current real time.
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_nanos: AtomicU64::new(0),
            unix_base_nanos: SystemClock.now_unix_nanos(),
        }
    }

    /// Advances the clock by `duration`.
    pub fn advance(&self, duration: Duration) {
        self.offset_nanos.fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }

    fn now_unix_nanos(&self) -> u64 {
        self.unix_base_nanos + self.offset_nanos.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances_monotonically() {
        let clock = TestClock::new();
        let t0 = clock.now();
        clock.advance(Duration::from_secs(5));
        let t1 = clock.now();
        assert_eq!(t1.duration_since(t0), Duration::from_secs(5));
    }

    #[test]
    fn system_clock_unix_nanos_increases() {
        let clock = SystemClock;
        let a = clock.now_unix_nanos();
        std::thread::sleep(Duration::from_millis(1));
        let b = clock.now_unix_nanos();
        assert!(b >= a);
    }
}
