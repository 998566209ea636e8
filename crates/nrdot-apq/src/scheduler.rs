use std::collections::{HashMap, VecDeque};

use nrdot_types::{Class, QueueItem};

/// Per-class FIFO sub-queues plus the weighted round-robin round state. Owned behind
/// a single mutex (together with the circuit breaker's counters guarded separately),
/// matching the "per-component single mutex" preference from the design notes.
pub(crate) struct SchedulerState {
    queues: HashMap<Class, VecDeque<QueueItem>>,
    weights: HashMap<Class, u32>,
    /// Quota remaining for the class currently being serviced, and the ones after it
    /// this round, indexed the same as `Class::ALL`.
    quotas: [u32; 3],
    /// Index into `Class::ALL` of the class currently being serviced.
    cursor: usize,
}

impl SchedulerState {
    pub(crate) fn new(weights: HashMap<Class, u32>) -> Self {
        let mut queues = HashMap::new();
        for class in Class::ALL {
            queues.insert(class, VecDeque::new());
        }
        let quotas = Class::ALL.map(|c| *weights.get(&c).unwrap_or(&1));
        Self {
            queues,
            weights,
            quotas,
            cursor: 0,
        }
    }

    pub(crate) fn push(&mut self, item: QueueItem) {
        self.queues.get_mut(&item.class).expect("all classes pre-populated").push_back(item);
    }

    pub(crate) fn depth(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    pub(crate) fn class_depth(&self, class: Class) -> usize {
        self.queues.get(&class).map(VecDeque::len).unwrap_or(0)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.depth() == 0
    }

    /// Pops the next item per the weighted round-robin schedule: classes are visited
    /// in strict priority order (Critical, High, Normal), each getting up to its
    /// weight's worth of consecutive opportunities before the scheduler moves to the
    /// next class. A class whose sub-queue is empty is skipped immediately even if
    /// its quota isn't exhausted. The round resets (every quota refilled) whenever the
    /// cursor wraps back to Critical.
    pub(crate) fn pop(&mut self) -> Option<QueueItem> {
        if self.is_empty() {
            return None;
        }
        // Two full cycles is always enough: one to discover which classes are
        // eligible, a second (after any wrap-triggered reset) to actually drain one,
        // since we already know at least one sub-queue is non-empty.
        for _ in 0..(Class::ALL.len() * 2 + 1) {
            let idx = self.cursor;
            let class = Class::ALL[idx];
            if self.quotas[idx] > 0 {
                if let Some(item) = self.queues.get_mut(&class).unwrap().pop_front() {
                    self.quotas[idx] -= 1;
                    if self.quotas[idx] == 0 || self.queues.get(&class).unwrap().is_empty() {
                        self.advance_cursor();
                    }
                    return Some(item);
                }
            }
            self.advance_cursor();
        }
        None
    }

    fn advance_cursor(&mut self) {
        self.cursor = (self.cursor + 1) % Class::ALL.len();
        if self.cursor == 0 {
            self.quotas = Class::ALL.map(|c| *self.weights.get(&c).unwrap_or(&1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nrdot_types::{AttributeMap, Kind, Record};

    fn item(class: Class) -> QueueItem {
        QueueItem::new(Record {
            kind: Kind::Metric,
            ingress_nanos: 0,
            attributes: AttributeMap::new(),
            class,
            debug: false,
            payload: vec![],
        })
    }

    fn weights(critical: u32, high: u32, normal: u32) -> HashMap<Class, u32> {
        let mut m = HashMap::new();
        m.insert(Class::Critical, critical);
        m.insert(Class::High, high);
        m.insert(Class::Normal, normal);
        m
    }

    #[test]
    fn saturated_queue_realizes_weight_ratio_within_tolerance() {
        let mut state = SchedulerState::new(weights(5, 3, 1));
        for _ in 0..10_000 {
            state.push(item(Class::Critical));
            state.push(item(Class::High));
            state.push(item(Class::Normal));
        }

        let mut counts = HashMap::new();
        for _ in 0..1000 {
            let popped = state.pop().expect("queue saturated, should never be empty");
            *counts.entry(popped.class).or_insert(0u32) += 1;
        }

        let critical_pct = counts[&Class::Critical] as f64 / 1000.0 * 100.0;
        let high_pct = counts[&Class::High] as f64 / 1000.0 * 100.0;
        let normal_pct = counts[&Class::Normal] as f64 / 1000.0 * 100.0;
        assert!((critical_pct - 55.5).abs() <= 2.0, "critical_pct={critical_pct}");
        assert!((high_pct - 33.3).abs() <= 2.0, "high_pct={high_pct}");
        assert!((normal_pct - 11.1).abs() <= 2.0, "normal_pct={normal_pct}");
    }

    #[test]
    fn empty_class_is_skipped_without_waiting_for_quota_exhaustion() {
        let mut state = SchedulerState::new(weights(5, 3, 1));
        state.push(item(Class::Normal));
        // Critical and High are empty; Normal should be returned immediately despite
        // holding the lowest weight and lowest priority.
        let popped = state.pop().unwrap();
        assert_eq!(popped.class, Class::Normal);
    }

    #[test]
    fn fifo_within_a_class() {
        let mut state = SchedulerState::new(weights(5, 3, 1));
        for i in 0..3u8 {
            let mut tagged = item(Class::Critical);
            tagged.payload.payload = vec![i];
            state.push(tagged);
        }
        let first = state.pop().unwrap();
        let second = state.pop().unwrap();
        let third = state.pop().unwrap();
        assert_eq!(first.payload.payload, vec![0]);
        assert_eq!(second.payload.payload, vec![1]);
        assert_eq!(third.payload.payload, vec![2]);
    }
}
