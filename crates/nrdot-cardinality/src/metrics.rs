use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time counters for the CardinalityLimiter, independent of any particular
/// metrics backend.
#[derive(Debug, Default)]
pub struct Metrics {
    dropped: AtomicU64,
    aggregated: AtomicU64,
    evicted: AtomicU64,
}

/// A snapshot of [`Metrics`] at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub table_size: usize,
    pub dropped: u64,
    pub aggregated: u64,
    pub evicted: u64,
}

impl Metrics {
    pub(crate) fn incr_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_aggregated(&self) {
        self.aggregated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_evicted(&self) {
        self.evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, table_size: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            table_size,
            dropped: self.dropped.load(Ordering::Relaxed),
            aggregated: self.aggregated.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }
}
