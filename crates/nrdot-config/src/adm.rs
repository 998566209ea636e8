use nrdot_types::Action;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::Error;

/// Scalar thresholds that drive ADM's level assessment.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Triggers {
    #[serde(default = "default_mem_util_high")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub mem_util_high: f64,

    #[serde(default = "default_queue_util_high")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub queue_util_high: f64,

    #[serde(default = "default_cpu_util_high")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub cpu_util_high: f64,

    #[serde(default = "default_err_rate_high")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub err_rate_high: f64,

    #[serde(default = "default_p99_latency_high_ms")]
    pub p99_latency_high_ms: f64,
}

fn default_mem_util_high() -> f64 {
    75.0
}
fn default_queue_util_high() -> f64 {
    70.0
}
fn default_cpu_util_high() -> f64 {
    80.0
}
fn default_err_rate_high() -> f64 {
    10.0
}
fn default_p99_latency_high_ms() -> f64 {
    500.0
}

impl Default for Triggers {
    fn default() -> Self {
        Self {
            mem_util_high: default_mem_util_high(),
            queue_util_high: default_queue_util_high(),
            cpu_util_high: default_cpu_util_high(),
            err_rate_high: default_err_rate_high(),
            p99_latency_high_ms: default_p99_latency_high_ms(),
        }
    }
}

/// One degradation level: an id and the actions that apply while at it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelConfig {
    pub level_id: String,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// Configuration for the AdaptiveDegradationManager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmConfig {
    #[serde(default)]
    pub triggers: Triggers,

    #[serde(default = "default_levels")]
    pub levels: Vec<LevelConfig>,

    #[serde(default = "default_check_interval_sec")]
    pub check_interval_sec: u64,

    #[serde(default = "default_cooldown_period_sec")]
    pub cooldown_period_sec: u64,
}

fn default_check_interval_sec() -> u64 {
    5
}

fn default_cooldown_period_sec() -> u64 {
    60
}

fn default_levels() -> Vec<LevelConfig> {
    vec![
        LevelConfig {
            level_id: "L0".into(),
            actions: vec![],
        },
        LevelConfig {
            level_id: "L1".into(),
            actions: vec![Action::IncBatch, Action::StretchScrape],
        },
        LevelConfig {
            level_id: "L2".into(),
            actions: vec![Action::IncBatch, Action::StretchScrape, Action::EnableSampling],
        },
        LevelConfig {
            level_id: "L3".into(),
            actions: vec![
                Action::IncBatch,
                Action::StretchScrape,
                Action::EnableSampling,
                Action::DropDebug,
                Action::DropMetrics,
            ],
        },
    ]
}

impl Default for AdmConfig {
    fn default() -> Self {
        Self {
            triggers: Triggers::default(),
            levels: default_levels(),
            check_interval_sec: default_check_interval_sec(),
            cooldown_period_sec: default_cooldown_period_sec(),
        }
    }
}

impl AdmConfig {
    pub(crate) fn validate_nrdot(&self) -> Result<(), Error> {
        self.triggers.validate().map_err(|e| Error::InvalidValue {
            field: "adm.triggers".into(),
            message: e.to_string(),
        })?;
        if self.levels.is_empty() {
            return Err(Error::EmptyLevels);
        }
        // Actions are already constrained to the closed set by `Action`'s own
        // deserialization (an unrecognized action name fails to parse), but we keep
        // this check as the one place the closed-set contract is asserted explicitly,
        // matching the distilled contract in the configuration surface table.
        for level in &self.levels {
            for action in &level.actions {
                if !Action::ALL.contains(action) {
                    return Err(Error::UnknownAction {
                        level_id: level.level_id.clone(),
                        action: action.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
