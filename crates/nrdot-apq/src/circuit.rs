use std::{collections::VecDeque, sync::Arc};

use nrdot_context::Clock;
use parking_lot::RwLock;
use tracing::{info, warn};

const WINDOW_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
}

struct Inner {
    state: State,
    /// Rolling window of the last `WINDOW_SIZE` drain outcomes, `true` = success.
    window: VecDeque<bool>,
    opened_at_nanos: u64,
}

/// Tracks rolling drain success/error counts and opens/closes the APQ's circuit to
/// the exporter. Guarded by its own read/write lock, separate from the mutex over the
/// per-class queues, per the concurrency model in §5.
pub struct CircuitBreaker {
    error_threshold_pct: f64,
    reset_timeout_sec: u64,
    enabled: bool,
    inner: RwLock<Inner>,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    pub fn new(enabled: bool, error_threshold_pct: f64, reset_timeout_sec: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            error_threshold_pct,
            reset_timeout_sec,
            enabled,
            inner: RwLock::new(Inner {
                state: State::Closed,
                window: VecDeque::with_capacity(WINDOW_SIZE),
                opened_at_nanos: 0,
            }),
            clock,
        }
    }

    /// `true` if enqueues should currently bypass in-memory buffering and go
    /// straight to the DLQ. Lazily resolves the open -> half-open transition: once
    /// `reset_timeout_sec` has elapsed since opening, traffic is let through again
    /// (the next recorded outcome is the probe that decides closed vs. re-open).
    pub fn is_open(&self) -> bool {
        if !self.enabled {
            return false;
        }
        let inner = self.inner.read();
        match inner.state {
            State::Closed => false,
            State::Open => {
                let elapsed_nanos = self.clock.now_unix_nanos().saturating_sub(inner.opened_at_nanos);
                elapsed_nanos < self.reset_timeout_sec * 1_000_000_000
            }
        }
    }

    /// Records a drain worker's outcome (`true` = success) and updates circuit state.
    pub fn record_outcome(&self, success: bool) {
        if !self.enabled {
            return;
        }
        let mut inner = self.inner.write();
        match inner.state {
            State::Closed => {
                if inner.window.len() == WINDOW_SIZE {
                    inner.window.pop_front();
                }
                inner.window.push_back(success);
                if inner.window.len() == WINDOW_SIZE {
                    let failures = inner.window.iter().filter(|&&s| !s).count();
                    let error_pct = failures as f64 / WINDOW_SIZE as f64 * 100.0;
                    if error_pct >= self.error_threshold_pct {
                        inner.state = State::Open;
                        inner.opened_at_nanos = self.clock.now_unix_nanos();
                        inner.window.clear();
                        warn!(error_pct, "APQ circuit breaker opened");
                    }
                }
            }
            State::Open => {
                let elapsed_nanos = self.clock.now_unix_nanos().saturating_sub(inner.opened_at_nanos);
                if elapsed_nanos >= self.reset_timeout_sec * 1_000_000_000 {
                    // Half-open probe: this outcome decides the next state.
                    if success {
                        inner.state = State::Closed;
                        inner.window.clear();
                        info!("APQ circuit breaker closed after successful probe");
                    } else {
                        inner.opened_at_nanos = self.clock.now_unix_nanos();
                        warn!("APQ circuit breaker probe failed, remaining open");
                    }
                }
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use nrdot_context::TestClock;

    use super::*;

    #[test]
    fn sub_threshold_error_mix_stays_closed() {
        // Below the configured 50% error_threshold_pct once the window fills: four
        // failures and six successes is a 40% error fraction.
        let breaker = CircuitBreaker::new(true, 50.0, 60, Arc::new(TestClock::new()));
        for _ in 0..4 {
            breaker.record_outcome(false);
        }
        for _ in 0..6 {
            breaker.record_outcome(true);
        }
        assert!(!breaker.is_open());
    }

    #[test]
    fn ten_failures_out_of_ten_opens() {
        let breaker = CircuitBreaker::new(true, 50.0, 60, Arc::new(TestClock::new()));
        for _ in 0..10 {
            breaker.record_outcome(false);
        }
        assert!(breaker.is_open());
    }

    #[test]
    fn reopens_after_failed_probe_and_closes_after_successful_probe() {
        let clock = Arc::new(TestClock::new());
        let breaker = CircuitBreaker::new(true, 50.0, 60, Arc::clone(&clock) as Arc<dyn Clock>);
        for _ in 0..10 {
            breaker.record_outcome(false);
        }
        assert!(breaker.is_open());

        clock.advance(std::time::Duration::from_secs(61));
        // Half-open: next outcome is the probe.
        breaker.record_outcome(false);
        assert!(breaker.is_open(), "failed probe should keep the circuit open");

        clock.advance(std::time::Duration::from_secs(61));
        breaker.record_outcome(true);
        assert!(!breaker.is_open(), "successful probe should close the circuit");
    }

    #[test]
    fn disabled_breaker_never_opens() {
        let breaker = CircuitBreaker::new(false, 50.0, 60, Arc::new(TestClock::new()));
        for _ in 0..50 {
            breaker.record_outcome(false);
        }
        assert!(!breaker.is_open());
    }
}
