use std::collections::HashMap;

use nrdot_types::Class;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::Error;

/// What happens to an overflowing enqueue once diverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowStrategy {
    Dlq,
    Drop,
    Block,
}

impl Default for OverflowStrategy {
    fn default() -> Self {
        OverflowStrategy::Dlq
    }
}

/// Configuration for the AdaptivePriorityQueue.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ApqConfig {
    /// Class -> integer weight map. Defaults to 5:3:1 for Critical:High:Normal.
    #[serde(default = "default_priorities")]
    pub priorities: HashMap<Class, u32>,

    #[serde(default = "default_max_queue_size")]
    #[validate(range(min = 1))]
    pub max_queue_size: usize,

    /// Percent of `max_queue_size` at which Normal enqueues divert.
    #[serde(default = "default_queue_full_threshold")]
    #[validate(range(min = 1.0, max = 100.0))]
    pub queue_full_threshold_pct: f64,

    /// Percent at which High enqueues divert (must be >= queue_full_threshold_pct).
    #[serde(default = "default_high_threshold")]
    #[validate(range(min = 1.0, max = 100.0))]
    pub high_threshold_pct: f64,

    #[serde(default)]
    pub overflow_strategy: OverflowStrategy,

    #[serde(default = "default_true")]
    pub circuit_breaker_enabled: bool,

    #[serde(default = "default_error_threshold")]
    #[validate(range(min = 1.0, max = 100.0))]
    pub error_threshold_pct: f64,

    #[serde(default = "default_reset_timeout_sec")]
    pub reset_timeout_sec: u64,
}

fn default_priorities() -> HashMap<Class, u32> {
    Class::ALL.iter().map(|c| (*c, c.default_weight())).collect()
}

fn default_max_queue_size() -> usize {
    10_000
}

fn default_queue_full_threshold() -> f64 {
    95.0
}

fn default_high_threshold() -> f64 {
    99.0
}

fn default_error_threshold() -> f64 {
    50.0
}

fn default_reset_timeout_sec() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for ApqConfig {
    fn default() -> Self {
        Self {
            priorities: default_priorities(),
            max_queue_size: default_max_queue_size(),
            queue_full_threshold_pct: default_queue_full_threshold(),
            high_threshold_pct: default_high_threshold(),
            overflow_strategy: OverflowStrategy::default(),
            circuit_breaker_enabled: true,
            error_threshold_pct: default_error_threshold(),
            reset_timeout_sec: default_reset_timeout_sec(),
        }
    }
}

impl ApqConfig {
    pub(crate) fn validate_nrdot(&self) -> Result<(), Error> {
        self.validate().map_err(|e| Error::InvalidValue {
            field: "apq".into(),
            message: e.to_string(),
        })?;
        if self.high_threshold_pct < self.queue_full_threshold_pct {
            return Err(Error::InvalidValue {
                field: "apq.high_threshold_pct".into(),
                message: "must be >= queue_full_threshold_pct".into(),
            });
        }
        Ok(())
    }
}
