use nrdot_types::Action;

/// The pipeline parameter mutations currently in force. Recomputed from scratch on
/// every level transition (actions are idempotent and last-writer-wins: there is no
/// "apply inc_batch twice, double twice" compounding), then published for ingress,
/// the exporter and the scrape loop to read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegradationEffects {
    pub batch_size_multiplier: u32,
    pub scrape_interval_multiplier: u32,
    /// Fraction of non-critical records admitted; `1.0` means no sampling drop.
    pub sample_rate: f64,
    pub drop_debug: bool,
    pub drop_metrics: bool,
}

impl Default for DegradationEffects {
    fn default() -> Self {
        Self {
            batch_size_multiplier: 1,
            scrape_interval_multiplier: 1,
            sample_rate: 1.0,
            drop_debug: false,
            drop_metrics: false,
        }
    }
}

impl DegradationEffects {
    /// Computes the effect set for a level from scratch, given its full action list.
    pub fn from_actions(actions: &[Action]) -> Self {
        let mut effects = Self::default();
        for action in actions {
            match action {
                Action::IncBatch => effects.batch_size_multiplier = 2,
                Action::StretchScrape => effects.scrape_interval_multiplier = 2,
                Action::EnableSampling => effects.sample_rate = 0.5,
                Action::DropDebug => effects.drop_debug = true,
                Action::DropMetrics => effects.drop_metrics = true,
            }
        }
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_has_no_effect() {
        assert_eq!(DegradationEffects::from_actions(&[]), DegradationEffects::default());
    }

    #[test]
    fn actions_are_idempotent() {
        let once = DegradationEffects::from_actions(&[Action::IncBatch]);
        let twice = DegradationEffects::from_actions(&[Action::IncBatch, Action::IncBatch]);
        assert_eq!(once, twice);
    }
}
