use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::Error;

/// Configuration for the EnhancedDLQ.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DlqConfig {
    #[serde(default = "default_directory")]
    pub directory: String,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    #[serde(default = "default_file_size_limit_mib")]
    #[validate(range(min = 1))]
    pub file_size_limit_mib: u64,

    #[serde(default = "default_retention_hours")]
    #[validate(range(min = 1))]
    pub retention_hours: u64,

    #[serde(default = "default_true")]
    pub verify_sha256: bool,

    #[serde(default = "default_replay_rate_mib_sec")]
    #[validate(range(min = 0.01))]
    pub replay_rate_mib_sec: f64,

    #[serde(default = "default_interleave_ratio")]
    #[validate(range(min = 1))]
    pub interleave_ratio: u32,

    #[serde(default)]
    pub replay_on_start: bool,

    #[serde(default = "default_replay_concurrency")]
    #[validate(range(min = 1))]
    pub replay_concurrency: usize,
}

fn default_directory() -> String {
    "./dlq".to_string()
}

fn default_file_prefix() -> String {
    "nrdot".to_string()
}

fn default_file_size_limit_mib() -> u64 {
    100
}

fn default_retention_hours() -> u64 {
    72
}

fn default_replay_rate_mib_sec() -> f64 {
    4.0
}

fn default_interleave_ratio() -> u32 {
    1
}

fn default_replay_concurrency() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl Default for DlqConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            file_prefix: default_file_prefix(),
            file_size_limit_mib: default_file_size_limit_mib(),
            retention_hours: default_retention_hours(),
            verify_sha256: true,
            replay_rate_mib_sec: default_replay_rate_mib_sec(),
            interleave_ratio: default_interleave_ratio(),
            replay_on_start: false,
            replay_concurrency: default_replay_concurrency(),
        }
    }
}

impl DlqConfig {
    pub(crate) fn validate_nrdot(&self) -> Result<(), Error> {
        self.validate().map_err(|e| Error::InvalidValue {
            field: "dlq".into(),
            message: e.to_string(),
        })
    }
}
