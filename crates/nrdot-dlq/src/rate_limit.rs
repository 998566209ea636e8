use parking_lot::Mutex;
use tokio::time::{Duration, Instant};

/// Byte-based sliding-window rate limiter used to pace replay. Implemented as a
/// continuously-refilling token bucket with a one-second burst capacity, which is
/// observationally equivalent to a one-second sliding window: over-consumption causes
/// `acquire` to sleep until enough of the window has passed to free up tokens.
pub struct ByteRateLimiter {
    rate_bytes_per_sec: f64,
    state: Mutex<State>,
}

struct State {
    available: f64,
    last_refill: Instant,
}

impl ByteRateLimiter {
    pub fn new(rate_bytes_per_sec: f64) -> Self {
        Self {
            rate_bytes_per_sec,
            state: Mutex::new(State {
                available: rate_bytes_per_sec,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Blocks (cooperatively) until `bytes` worth of budget is available, then
    /// consumes it.
    pub async fn acquire(&self, bytes: u64) {
        loop {
            let wait = {
                let mut state = self.state.lock();
                self.refill(&mut state);
                if state.available >= bytes as f64 {
                    state.available -= bytes as f64;
                    None
                } else {
                    let deficit = bytes as f64 - state.available;
                    Some(Duration::from_secs_f64((deficit / self.rate_bytes_per_sec).max(0.0)))
                }
            };
            match wait {
                None => return,
                Some(duration) => tokio::time::sleep(duration).await,
            }
        }
    }

    fn refill(&self, state: &mut State) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill);
        state.available = (state.available + elapsed.as_secs_f64() * self.rate_bytes_per_sec)
            .min(self.rate_bytes_per_sec);
        state.last_refill = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn acquiring_within_budget_does_not_sleep() {
        let limiter = ByteRateLimiter::new(4.0 * 1024.0 * 1024.0);
        let start = Instant::now();
        limiter.acquire(1024).await;
        assert_eq!(Instant::now(), start, "should not have needed to sleep");
    }

    #[tokio::test(start_paused = true)]
    async fn over_budget_acquire_sleeps_until_window_permits() {
        let limiter = ByteRateLimiter::new(1024.0);
        limiter.acquire(1024).await; // drains the initial burst
        let start = Instant::now();
        limiter.acquire(1024).await;
        assert!(Instant::now() > start, "should have slept for replenishment");
    }
}
