use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use nrdot_types::Class;
use parking_lot::Mutex;

/// Point-in-time counters for the AdaptivePriorityQueue, independent of any
/// particular metrics backend.
#[derive(Default)]
pub struct Metrics {
    processed: Mutex<HashMap<Class, u64>>,
    diverted: AtomicU64,
    dropped: AtomicU64,
    circuit_rejections: AtomicU64,
    divert_failures: AtomicU64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub depth: usize,
    pub processed_by_class: HashMap<Class, u64>,
    pub diverted: u64,
    pub dropped: u64,
    pub circuit_rejections: u64,
    pub divert_failures: u64,
    pub circuit_open: bool,
}

impl Metrics {
    pub(crate) fn incr_processed(&self, class: Class) {
        *self.processed.lock().entry(class).or_insert(0) += 1;
    }

    pub(crate) fn incr_diverted(&self) {
        self.diverted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_circuit_rejections(&self) {
        self.circuit_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_divert_failures(&self) {
        self.divert_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, depth: usize, circuit_open: bool) -> MetricsSnapshot {
        MetricsSnapshot {
            depth,
            processed_by_class: self.processed.lock().clone(),
            diverted: self.diverted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            circuit_rejections: self.circuit_rejections.load(Ordering::Relaxed),
            divert_failures: self.divert_failures.load(Ordering::Relaxed),
            circuit_open,
        }
    }
}
