use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Replay,
    Live,
}

struct State {
    phase: Phase,
    remaining: u32,
    /// Last time either side made progress. If the live side goes quiet for longer
    /// than `idle_timeout` while it holds the phase, replay is allowed to reclaim it
    /// rather than stall forever waiting for live traffic that may never arrive.
    last_activity: Instant,
}

/// Alternates consumption rights between replay and live streams in a fixed ratio.
///
/// The source this pipeline is modeled on flips the gate *inside* `AllowReplay`
/// itself, so two concurrent callers could both observe `true` for what was meant to
/// be a single slot. Here the query and the consumption are one atomic operation
/// under a single lock, which is the fix the design notes call for.
pub struct Interleaver {
    ratio: u32,
    idle_timeout: Duration,
    state: Mutex<State>,
}

/// If the live side hasn't claimed its slots within this long, replay reclaims the
/// phase. Keeps a lone replay walk (no live traffic at all) from stalling forever.
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(200);

impl Interleaver {
    /// `ratio` replay records are permitted, then `ratio` live enqueues, alternating.
    pub fn new(ratio: u32) -> Self {
        Self::with_idle_timeout(ratio, DEFAULT_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(ratio: u32, idle_timeout: Duration) -> Self {
        let ratio = ratio.max(1);
        Self {
            ratio,
            idle_timeout,
            state: Mutex::new(State {
                phase: Phase::Replay,
                remaining: ratio,
                last_activity: Instant::now(),
            }),
        }
    }

    /// Atomically checks and, if granted, consumes one replay slot.
    pub fn allow_replay(&self) -> bool {
        let mut state = self.state.lock();
        if state.phase != Phase::Replay {
            if state.last_activity.elapsed() < self.idle_timeout {
                return false;
            }
            state.phase = Phase::Replay;
            state.remaining = self.ratio;
        }
        state.remaining -= 1;
        state.last_activity = Instant::now();
        if state.remaining == 0 {
            state.phase = Phase::Live;
            state.remaining = self.ratio;
        }
        true
    }

    /// Atomically checks and, if granted, consumes one live slot.
    pub fn allow_live(&self) -> bool {
        let mut state = self.state.lock();
        if state.phase != Phase::Live {
            return false;
        }
        state.remaining -= 1;
        state.last_activity = Instant::now();
        if state.remaining == 0 {
            state.phase = Phase::Replay;
            state.remaining = self.ratio;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn alternates_in_fixed_ratio() {
        let interleaver = Interleaver::new(2);
        assert!(interleaver.allow_replay());
        assert!(interleaver.allow_replay());
        assert!(!interleaver.allow_replay());
        assert!(interleaver.allow_live());
        assert!(interleaver.allow_live());
        assert!(!interleaver.allow_live());
        assert!(interleaver.allow_replay());
    }

    #[test]
    fn concurrent_callers_never_both_consume_the_same_slot() {
        let interleaver = Arc::new(Interleaver::new(1));
        let mut handles = vec![];
        for _ in 0..8 {
            let interleaver = Arc::clone(&interleaver);
            handles.push(std::thread::spawn(move || interleaver.allow_replay()));
        }
        let granted: usize = handles.into_iter().map(|h| h.join().unwrap() as usize).sum();
        assert_eq!(granted, 1, "exactly one caller should have been granted the single slot");
    }
}
