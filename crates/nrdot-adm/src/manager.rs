use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use nrdot_config::AdmConfig;
use nrdot_context::Clock;
use nrdot_types::{Kind, PipelineState};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::{assess::desired_level, effects::DegradationEffects, metrics::Metrics, MetricsSnapshot};

/// Resource-pressure-driven controller that escalates/de-escalates a degradation
/// level and mutates pipeline parameters (batch size, scrape interval, sampling,
/// drop-class flags) with a cooldown gate on downgrades. Holds a single read/write
/// lock over its published "current level", serializing transitions.
pub struct AdaptiveDegradationManager {
    config: AdmConfig,
    clock: Arc<dyn Clock>,
    current_level: RwLock<usize>,
    effects: RwLock<DegradationEffects>,
    last_change_nanos: AtomicU64,
    metrics: Metrics,
}

impl AdaptiveDegradationManager {
    pub fn new(config: AdmConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_unix_nanos();
        Self {
            config,
            clock,
            current_level: RwLock::new(0),
            effects: RwLock::new(DegradationEffects::default()),
            last_change_nanos: AtomicU64::new(now),
            metrics: Metrics::default(),
        }
    }

    /// Assesses `state` and applies a level transition if warranted: upgrades apply
    /// immediately and reset the cooldown timer; downgrades only apply once
    /// `cooldown_period_sec` has elapsed since the last change.
    pub fn tick(&self, state: PipelineState) {
        let max_index = self.config.levels.len().saturating_sub(1);
        let desired = desired_level(&state, &self.config.triggers).min(max_index);

        let mut current = self.current_level.write();
        if desired == *current {
            return;
        }

        if desired > *current {
            self.apply_level(desired);
            *current = desired;
            self.last_change_nanos.store(self.clock.now_unix_nanos(), Ordering::SeqCst);
            return;
        }

        // desired < current: a downgrade, gated by cooldown.
        let elapsed_nanos = self
            .clock
            .now_unix_nanos()
            .saturating_sub(self.last_change_nanos.load(Ordering::SeqCst));
        let cooldown_nanos = self.config.cooldown_period_sec * 1_000_000_000;
        if elapsed_nanos >= cooldown_nanos {
            self.apply_level(desired);
            *current = desired;
            self.last_change_nanos.store(self.clock.now_unix_nanos(), Ordering::SeqCst);
        } else {
            tracing::trace!(
                desired,
                current = *current,
                elapsed_nanos,
                cooldown_nanos,
                "ADM downgrade deferred by cooldown"
            );
        }
    }

    fn apply_level(&self, index: usize) {
        let level = &self.config.levels[index];
        let effects = DegradationEffects::from_actions(&level.actions);
        *self.effects.write() = effects;
        for action in &level.actions {
            self.metrics.record_activation(*action);
        }
        if index > 0 {
            warn!(level = %level.level_id, "ADM level escalated");
        } else {
            info!(level = %level.level_id, "ADM level returned to baseline");
        }
    }

    /// The currently published effect set, read by ingress, the exporter and the
    /// scrape loop.
    pub fn effects(&self) -> DegradationEffects {
        *self.effects.read()
    }

    pub fn current_level_id(&self) -> String {
        let index = *self.current_level.read();
        self.config.levels[index].level_id.clone()
    }

    pub fn current_level_index(&self) -> usize {
        *self.current_level.read()
    }

    /// Records that a record of `kind` was dropped because of an active
    /// `drop_debug`/`drop_metrics` effect, for the per-dropped-kind counters.
    pub fn record_drop(&self, kind: Kind) {
        self.metrics.record_drop(kind);
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot(self.current_level_id(), self.current_level_index())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use nrdot_context::TestClock;
    use nrdot_types::Action;

    use super::*;

    fn state(mem: f64) -> PipelineState {
        PipelineState {
            mem_util_pct: mem,
            queue_util_pct: 0.0,
            cpu_util_pct: 0.0,
            err_rate_pct: 0.0,
            p99_latency_ms: 0.0,
        }
    }

    #[test]
    fn upgrades_apply_immediately() {
        let adm = AdaptiveDegradationManager::new(AdmConfig::default(), Arc::new(TestClock::new()));
        adm.tick(state(95.0));
        assert_eq!(adm.current_level_index(), 3);
        assert!(adm.effects().drop_metrics);
    }

    #[test]
    fn downgrade_deferred_until_cooldown_elapses() {
        let clock = Arc::new(TestClock::new());
        let adm = AdaptiveDegradationManager::new(AdmConfig::default(), Arc::clone(&clock) as Arc<dyn Clock>);
        adm.tick(state(95.0));
        assert_eq!(adm.current_level_index(), 3);

        clock.advance(Duration::from_secs(59));
        adm.tick(state(10.0));
        assert_eq!(adm.current_level_index(), 3, "downgrade before cooldown must be deferred");

        clock.advance(Duration::from_secs(1));
        adm.tick(state(10.0));
        assert_eq!(adm.current_level_index(), 0, "downgrade at cooldown boundary must apply");
    }

    #[test]
    fn reset_then_reapply_on_every_transition() {
        let adm = AdaptiveDegradationManager::new(AdmConfig::default(), Arc::new(TestClock::new()));
        adm.tick(state(85.0)); // L2: inc_batch, stretch_scrape, enable_sampling
        let effects = adm.effects();
        assert_eq!(effects.batch_size_multiplier, 2);
        assert_eq!(effects.sample_rate, 0.5);
        assert!(!effects.drop_debug, "L2 must not carry L3's drop_debug");
    }

    #[test]
    fn action_activation_counters_increment_on_escalation() {
        let adm = AdaptiveDegradationManager::new(AdmConfig::default(), Arc::new(TestClock::new()));
        adm.tick(state(95.0));
        let snapshot = adm.metrics();
        assert_eq!(*snapshot.action_activations.get(&Action::DropMetrics).unwrap(), 1);
    }
}
