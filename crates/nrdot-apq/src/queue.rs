use std::{sync::Arc, time::Duration};

use nrdot_config::{ApqConfig, OverflowStrategy};
use nrdot_context::{CancellationToken, Clock};
use nrdot_dlq::Dlq;
use nrdot_types::{Class, QueueItem, Record};
use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::{circuit::CircuitBreaker, metrics::Metrics, scheduler::SchedulerState, MetricsSnapshot};

/// Outcome of [`AdaptivePriorityQueue::enqueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Buffered in-memory for later drain.
    Accepted,
    /// Diverted to the DLQ under pressure (spill policy).
    DivertedToDlq,
    /// Diverted to the DLQ because the circuit breaker is open.
    RejectedByCircuit,
    /// Dropped per `overflow_strategy: drop`.
    Dropped,
    /// Diversion to the DLQ was required but the write itself failed.
    DivertFailed,
}

/// Multi-class bounded queue; dequeue order approximates weighted round-robin across
/// classes, with spill-on-pressure diversion to the DLQ and a circuit breaker that
/// routes around in-memory buffering entirely while the exporter is unhealthy.
pub struct AdaptivePriorityQueue {
    max_queue_size: usize,
    queue_full_threshold_pct: f64,
    high_threshold_pct: f64,
    overflow_strategy: OverflowStrategy,
    state: Mutex<SchedulerState>,
    not_empty: Condvar,
    space_available: Condvar,
    circuit: CircuitBreaker,
    dlq: Arc<Dlq>,
    metrics: Metrics,
}

impl AdaptivePriorityQueue {
    pub fn new(config: &ApqConfig, dlq: Arc<Dlq>, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_queue_size: config.max_queue_size,
            queue_full_threshold_pct: config.queue_full_threshold_pct,
            high_threshold_pct: config.high_threshold_pct,
            overflow_strategy: config.overflow_strategy,
            state: Mutex::new(SchedulerState::new(config.priorities.clone())),
            not_empty: Condvar::new(),
            space_available: Condvar::new(),
            circuit: CircuitBreaker::new(
                config.circuit_breaker_enabled,
                config.error_threshold_pct,
                config.reset_timeout_sec,
                clock,
            ),
            dlq,
            metrics: Metrics::default(),
        }
    }

    /// Admits `record` into the queue, diverting to the DLQ under pressure or when
    /// the circuit is open, per the spill policy and `overflow_strategy`.
    pub fn enqueue(&self, record: Record) -> EnqueueOutcome {
        let item = QueueItem::new(record);

        if self.circuit.is_open() {
            self.metrics.incr_circuit_rejections();
            return match self.write_to_dlq(&item) {
                Ok(()) => EnqueueOutcome::RejectedByCircuit,
                Err(_) => {
                    self.metrics.incr_divert_failures();
                    EnqueueOutcome::DivertFailed
                }
            };
        }

        let mut state = self.state.lock();
        let depth = state.depth();
        if self.should_divert(item.class, depth) {
            drop(state);
            return self.divert(item);
        }
        state.push(item);
        drop(state);
        self.not_empty.notify_one();
        EnqueueOutcome::Accepted
    }

    fn divert(&self, item: QueueItem) -> EnqueueOutcome {
        match self.overflow_strategy {
            OverflowStrategy::Dlq => match self.write_to_dlq(&item) {
                Ok(()) => {
                    self.metrics.incr_diverted();
                    EnqueueOutcome::DivertedToDlq
                }
                Err(_) => {
                    self.metrics.incr_divert_failures();
                    EnqueueOutcome::DivertFailed
                }
            },
            OverflowStrategy::Drop => {
                self.metrics.incr_dropped();
                EnqueueOutcome::Dropped
            }
            OverflowStrategy::Block => {
                let class = item.class;
                let mut state = self.state.lock();
                self.space_available.wait_while(&mut state, |s| self.should_divert(class, s.depth()));
                state.push(item);
                drop(state);
                self.not_empty.notify_one();
                EnqueueOutcome::Accepted
            }
        }
    }

    /// `true` if an ingress of `class` at `depth` (items currently resident) should be
    /// diverted rather than buffered. Critical only diverts when the queue is
    /// absolutely full; High diverts above the secondary threshold; Normal diverts at
    /// the primary `queue_full_threshold_pct`.
    fn should_divert(&self, class: Class, depth: usize) -> bool {
        let pct = depth as f64 / self.max_queue_size as f64 * 100.0;
        match class {
            Class::Normal => pct >= self.queue_full_threshold_pct,
            Class::High => pct >= self.high_threshold_pct,
            Class::Critical => depth >= self.max_queue_size,
        }
    }

    fn write_to_dlq(&self, item: &QueueItem) -> Result<(), nrdot_dlq::Error> {
        self.dlq.write(item.payload.kind, item.class, &item.payload.payload)
    }

    /// Non-blocking dequeue; returns `None` immediately if every sub-queue is empty.
    /// Never fails.
    pub fn dequeue(&self) -> Option<QueueItem> {
        let mut state = self.state.lock();
        let item = state.pop();
        drop(state);
        if let Some(item) = &item {
            self.space_available.notify_one();
            self.metrics.incr_processed(item.class);
            trace!(class = %item.class, "APQ dequeue");
        }
        item
    }

    /// Blocking dequeue: waits (cooperatively) for an item or for `cancel` to fire.
    /// Returns `None` on cancellation, never on a transient empty queue.
    pub async fn dequeue_blocking(&self, cancel: &CancellationToken) -> Option<QueueItem> {
        loop {
            if let Some(item) = self.dequeue() {
                return Some(item);
            }
            if cancel.is_cancelled() {
                return None;
            }
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(Duration::from_millis(5)) => {}
            }
        }
    }

    /// Records a drain worker's send outcome, feeding the circuit breaker.
    pub fn record_drain_outcome(&self, success: bool) {
        self.circuit.record_outcome(success);
    }

    pub fn is_circuit_open(&self) -> bool {
        self.circuit.is_open()
    }

    pub fn depth(&self) -> usize {
        self.state.lock().depth()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        let depth = self.state.lock().depth();
        self.metrics.snapshot(depth, self.circuit.is_open())
    }

    /// Unparks anything blocked in [`Self::dequeue_blocking`]'s sleep early; used on
    /// shutdown so drain loops notice cancellation promptly rather than waiting out
    /// their poll interval.
    pub fn wake_waiters(&self) {
        self.not_empty.notify_all();
        self.space_available.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use nrdot_context::SystemClock;
    use nrdot_types::{AttributeMap, Kind};

    use super::*;

    fn record(class: Class) -> Record {
        Record {
            kind: Kind::Metric,
            ingress_nanos: 0,
            attributes: AttributeMap::new(),
            class,
            debug: false,
            payload: vec![1, 2, 3],
        }
    }

    fn scratch_dlq(name: &str) -> Arc<Dlq> {
        let dir = std::env::temp_dir().join(format!("nrdot-apq-test-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        Arc::new(Dlq::open(&dir, "seg", 100, Arc::new(SystemClock)).unwrap())
    }

    #[test]
    fn depth_never_exceeds_max_queue_size() {
        let config = ApqConfig {
            max_queue_size: 800,
            queue_full_threshold_pct: 95.0,
            overflow_strategy: OverflowStrategy::Dlq,
            ..ApqConfig::default()
        };
        let dlq = scratch_dlq("depth-bound");
        let apq = AdaptivePriorityQueue::new(&config, dlq, Arc::new(SystemClock));

        let mut diverted = 0u32;
        for _ in 0..900 {
            let outcome = apq.enqueue(record(Class::Normal));
            if matches!(outcome, EnqueueOutcome::DivertedToDlq) {
                diverted += 1;
            }
            assert!(apq.depth() <= 800, "depth invariant violated: {}", apq.depth());
        }
        assert!(diverted >= 100, "diverted={diverted}");
    }

    #[test]
    fn normal_diverts_exactly_at_threshold() {
        let config = ApqConfig {
            max_queue_size: 100,
            queue_full_threshold_pct: 95.0,
            overflow_strategy: OverflowStrategy::Dlq,
            ..ApqConfig::default()
        };
        let dlq = scratch_dlq("boundary");
        let apq = AdaptivePriorityQueue::new(&config, dlq, Arc::new(SystemClock));
        for _ in 0..95 {
            apq.enqueue(record(Class::Normal));
        }
        let outcome = apq.enqueue(record(Class::Normal));
        assert_eq!(outcome, EnqueueOutcome::DivertedToDlq);
    }

    #[test]
    fn drop_strategy_never_touches_the_dlq() {
        let config = ApqConfig {
            max_queue_size: 10,
            queue_full_threshold_pct: 50.0,
            overflow_strategy: OverflowStrategy::Drop,
            ..ApqConfig::default()
        };
        let dlq = scratch_dlq("drop-strategy");
        let apq = AdaptivePriorityQueue::new(&config, Arc::clone(&dlq), Arc::new(SystemClock));
        for _ in 0..10 {
            apq.enqueue(record(Class::Normal));
        }
        let outcome = apq.enqueue(record(Class::Normal));
        assert_eq!(outcome, EnqueueOutcome::Dropped);
    }

    #[test]
    fn processed_count_matches_total_dequeues() {
        let config = ApqConfig::default();
        let dlq = scratch_dlq("processed-count");
        let apq = AdaptivePriorityQueue::new(&config, dlq, Arc::new(SystemClock));
        for class in [Class::Critical, Class::High, Class::Normal] {
            for _ in 0..5 {
                apq.enqueue(record(class));
            }
        }
        let mut dequeued = 0;
        while apq.dequeue().is_some() {
            dequeued += 1;
        }
        let snapshot = apq.metrics();
        let processed_total: u64 = snapshot.processed_by_class.values().sum();
        assert_eq!(processed_total, dequeued as u64);
        assert_eq!(dequeued, 15);
    }

    #[test]
    fn circuit_open_bypasses_buffering() {
        let config = ApqConfig {
            error_threshold_pct: 50.0,
            reset_timeout_sec: 60,
            ..ApqConfig::default()
        };
        let dlq = scratch_dlq("circuit-bypass");
        let apq = AdaptivePriorityQueue::new(&config, dlq, Arc::new(SystemClock));
        for _ in 0..10 {
            apq.record_drain_outcome(false);
        }
        assert!(apq.is_circuit_open());
        let outcome = apq.enqueue(record(Class::Critical));
        assert_eq!(outcome, EnqueueOutcome::RejectedByCircuit);
        assert_eq!(apq.depth(), 0, "bypassed items must not enter the in-memory queue");
    }
}
