use std::{collections::HashMap, sync::Arc};

use nrdot_context::Clock;
use nrdot_types::{AttributeKeySet, KeySetEntry, Record};
use parking_lot::Mutex;
use tracing::trace;

use crate::{
    entropy::EntropyTracker,
    metrics::{Metrics, MetricsSnapshot},
};

/// Length of the retained prefix when collapsing a non-preserved dimension's value
/// during aggregation.
const AGGREGATION_PREFIX_LEN: usize = 5;

const DROP_THRESHOLD: f64 = 0.75;
const EVICT_THRESHOLD: f64 = 0.9;

/// Outcome of [`CardinalityLimiter::admit`].
#[derive(Debug, Clone, PartialEq)]
pub enum AdmitDecision {
    /// Admitted as-is.
    Keep(AttributeKeySet),
    /// Admitted after collapsing non-preserved dimensions.
    Aggregate(AttributeKeySet),
    /// Not admitted.
    Drop,
}

struct TableEntry {
    keyset: AttributeKeySet,
    meta: KeySetEntry,
}

struct Inner {
    table: HashMap<u64, TableEntry>,
    entropy: EntropyTracker,
}

/// Entropy-ranked admission of unique attribute key-sets into a bounded table.
///
/// `Admit` is O(1) expected time, never blocks on I/O, and never surfaces an error:
/// every decision is local and observable through [`CardinalityLimiter::metrics`].
pub struct CardinalityLimiter {
    max_unique_keysets: usize,
    aggregation_dimensions: Vec<String>,
    inner: Mutex<Inner>,
    metrics: Metrics,
    clock: Arc<dyn Clock>,
}

impl CardinalityLimiter {
    pub fn new(max_unique_keysets: usize, aggregation_dimensions: Vec<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_unique_keysets,
            aggregation_dimensions,
            inner: Mutex::new(Inner {
                table: HashMap::new(),
                entropy: EntropyTracker::new(),
            }),
            metrics: Metrics::default(),
            clock,
        }
    }

    pub fn from_config(config: &nrdot_config::CardinalityConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(config.max_unique_keysets, config.aggregation_dimensions.clone(), clock)
    }

    /// Decides whether to keep, aggregate, or drop `record`, based on the entropy of
    /// its attribute key-set and the current fill of the table.
    pub fn admit(&self, record: &Record) -> AdmitDecision {
        let keyset = AttributeKeySet::from_attributes(&record.attributes);
        let hash = keyset.stable_hash();
        let now = self.clock.now_unix_nanos();

        let mut inner = self.inner.lock();

        if let Some(entry) = inner.table.get_mut(&hash) {
            entry.meta.last_seen_nanos = now;
            entry.meta.access_count += 1;
            return AdmitDecision::Keep(keyset);
        }

        let score = inner.entropy.score_keyset(keyset.pairs());

        if inner.table.len() < self.max_unique_keysets {
            inner.table.insert(
                hash,
                TableEntry {
                    keyset: keyset.clone(),
                    meta: KeySetEntry {
                        key_hash: hash,
                        last_seen_nanos: now,
                        access_count: 1,
                        entropy_score: score,
                    },
                },
            );
            return AdmitDecision::Keep(keyset);
        }

        if score < DROP_THRESHOLD {
            self.metrics.incr_dropped();
            trace!(score, "cardinality table full, dropping low-entropy key-set");
            return AdmitDecision::Drop;
        }

        if score < EVICT_THRESHOLD {
            let aggregated = keyset.aggregated(&self.aggregation_dimensions, AGGREGATION_PREFIX_LEN);
            let agg_hash = aggregated.stable_hash();
            if let Some(entry) = inner.table.get_mut(&agg_hash) {
                entry.meta.last_seen_nanos = now;
                entry.meta.access_count += 1;
            } else {
                // The aggregated key-set is itself new; admit it as a first-class
                // entry, evicting the globally lowest-scoring entry if necessary to
                // preserve the table-size invariant.
                Self::insert_evicting(&mut inner.table, agg_hash, aggregated.clone(), now, score, &self.metrics, false);
            }
            self.metrics.incr_aggregated();
            return AdmitDecision::Aggregate(aggregated);
        }

        // score >= EVICT_THRESHOLD: evict the lowest-scoring existing entry, provided
        // it scores strictly lower than the incoming key-set; otherwise drop.
        if Self::insert_evicting(&mut inner.table, hash, keyset.clone(), now, score, &self.metrics, true) {
            AdmitDecision::Keep(keyset)
        } else {
            self.metrics.incr_dropped();
            AdmitDecision::Drop
        }
    }

    /// Attempts to find room for `(hash, keyset)` in a full table by evicting the
    /// lowest-scoring entry (tie-break: lower `access_count`, then older
    /// `last_seen_nanos`). If `require_strictly_lower` is set, eviction only proceeds
    /// when the victim's score is strictly lower than `incoming_score`; returns
    /// `false` (no insertion) otherwise.
    fn insert_evicting(
        table: &mut HashMap<u64, TableEntry>,
        hash: u64,
        keyset: AttributeKeySet,
        now: u64,
        incoming_score: f64,
        metrics: &Metrics,
        require_strictly_lower: bool,
    ) -> bool {
        let victim = table
            .iter()
            .min_by(|(_, a), (_, b)| {
                a.meta
                    .entropy_score
                    .partial_cmp(&b.meta.entropy_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.meta.access_count.cmp(&b.meta.access_count))
                    .then(a.meta.last_seen_nanos.cmp(&b.meta.last_seen_nanos))
            })
            .map(|(&h, e)| (h, e.meta.entropy_score));

        let victim_hash = match victim {
            Some((h, victim_score)) => {
                if require_strictly_lower && victim_score >= incoming_score {
                    return false;
                }
                h
            }
            None => return false,
        };

        table.remove(&victim_hash);
        metrics.incr_evicted();
        table.insert(
            hash,
            TableEntry {
                keyset,
                meta: KeySetEntry {
                    key_hash: hash,
                    last_seen_nanos: now,
                    access_count: 1,
                    entropy_score: incoming_score,
                },
            },
        );
        true
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        let inner = self.inner.lock();
        self.metrics.snapshot(inner.table.len())
    }

    pub fn table_size(&self) -> usize {
        self.inner.lock().table.len()
    }
}
