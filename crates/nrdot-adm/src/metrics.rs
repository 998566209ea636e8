use std::collections::HashMap;

use nrdot_types::{Action, Kind};
use parking_lot::Mutex;

/// Point-in-time counters for the AdaptiveDegradationManager, independent of any
/// particular metrics backend.
#[derive(Default)]
pub struct Metrics {
    action_activations: Mutex<HashMap<Action, u64>>,
    kind_drops: Mutex<HashMap<Kind, u64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub current_level_id: String,
    pub current_level_index: usize,
    pub action_activations: HashMap<Action, u64>,
    pub kind_drops: HashMap<Kind, u64>,
}

impl Metrics {
    pub(crate) fn record_activation(&self, action: Action) {
        *self.action_activations.lock().entry(action).or_insert(0) += 1;
    }

    pub(crate) fn record_drop(&self, kind: Kind) {
        *self.kind_drops.lock().entry(kind).or_insert(0) += 1;
    }

    pub(crate) fn snapshot(&self, current_level_id: String, current_level_index: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            current_level_id,
            current_level_index,
            action_activations: self.action_activations.lock().clone(),
            kind_drops: self.kind_drops.lock().clone(),
        }
    }
}
