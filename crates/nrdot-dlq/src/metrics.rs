use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Point-in-time counters for the EnhancedDLQ, independent of any particular metrics
/// backend.
#[derive(Debug, Default)]
pub struct Metrics {
    bytes_written: AtomicU64,
    records_written: AtomicU64,
    bytes_replayed: AtomicU64,
    records_replayed: AtomicU64,
    verification_fails: AtomicU64,
    replay_active: AtomicBool,
    segments_retired: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricsSnapshot {
    pub file_count: usize,
    pub bytes_written: u64,
    pub records_written: u64,
    pub bytes_replayed: u64,
    pub records_replayed: u64,
    pub verification_fails: u64,
    pub replay_active: bool,
    pub segments_retired: u64,
}

impl Metrics {
    pub(crate) fn incr_bytes_written(&self, n: u64) {
        self.bytes_written.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn incr_records_written(&self) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_bytes_replayed(&self, n: u64) {
        self.bytes_replayed.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn incr_records_replayed(&self) {
        self.records_replayed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_verification_fails(&self) {
        self.verification_fails.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_replay_active(&self, active: bool) {
        self.replay_active.store(active, Ordering::SeqCst);
    }

    pub(crate) fn incr_segments_retired(&self, n: u64) {
        self.segments_retired.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, file_count: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            file_count,
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            bytes_replayed: self.bytes_replayed.load(Ordering::Relaxed),
            records_replayed: self.records_replayed.load(Ordering::Relaxed),
            verification_fails: self.verification_fails.load(Ordering::Relaxed),
            replay_active: self.replay_active.load(Ordering::SeqCst),
            segments_retired: self.segments_retired.load(Ordering::Relaxed),
        }
    }
}
