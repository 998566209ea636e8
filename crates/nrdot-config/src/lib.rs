#![warn(rust_2021_compatibility, unreachable_pub)]

//! Validated configuration surface for the NRDOT+ pipeline.
//!
//! A single [`Config`] object is deserialized from YAML, defaults are filled in by
//! `serde`'s `#[serde(default = ...)]` machinery, and cross-field invariants (closed
//! action sets, threshold ordering, non-empty level lists) are checked by
//! [`Config::validate_nrdot`]. Nothing downstream should ever observe a `Config` that
//! hasn't passed validation; [`Config::from_yaml_str`] and [`Config::from_file`] are
//! the only constructors and both validate before returning.

mod adm;
mod apq;
mod cardinality;
mod dlq;
mod error;

use std::{fs, path::Path};

pub use adm::{AdmConfig, LevelConfig, Triggers};
pub use apq::{ApqConfig, OverflowStrategy};
pub use cardinality::CardinalityConfig;
pub use dlq::DlqConfig;
pub use error::Error;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The full, validated NRDOT+ pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cardinality: CardinalityConfig,
    #[serde(default)]
    pub apq: ApqConfig,
    #[serde(default)]
    pub dlq: DlqConfig,
    #[serde(default)]
    pub adm: AdmConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cardinality: CardinalityConfig::default(),
            apq: ApqConfig::default(),
            dlq: DlqConfig::default(),
            adm: AdmConfig::default(),
        }
    }
}

impl Config {
    /// Parses and validates a configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, Error> {
        let config: Config = serde_yaml::from_str(yaml).map_err(|err| Error::InvalidConfig {
            file: "<string>".into(),
            message: err.to_string(),
        })?;
        config.validate_nrdot()?;
        Ok(config)
    }

    /// Loads, parses and validates a configuration from a YAML file on disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let file_name = path.display().to_string();
        debug!(file = %file_name, "loading configuration");
        let contents = fs::read_to_string(path).map_err(|err| Error::InvalidConfig {
            file: file_name.clone(),
            message: err.to_string(),
        })?;
        let config: Config = serde_yaml::from_str(&contents).map_err(|err| Error::InvalidConfig {
            file: file_name.clone(),
            message: err.to_string(),
        })?;
        config.validate_nrdot()?;
        debug!(file = %file_name, "configuration loaded and validated");
        Ok(config)
    }

    /// Validates the configuration, rejecting obviously invalid values.
    pub fn validate_nrdot(&self) -> Result<(), Error> {
        self.cardinality.validate_nrdot()?;
        self.apq.validate_nrdot()?;
        self.dlq.validate_nrdot()?;
        self.adm.validate_nrdot()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        assert!(config.validate_nrdot().is_ok());
    }

    #[test]
    fn empty_yaml_fills_defaults() {
        let config = Config::from_yaml_str("{}").expect("defaults should parse");
        assert_eq!(config.cardinality.max_unique_keysets, 65_536);
        assert_eq!(config.dlq.retention_hours, 72);
        assert_eq!(config.adm.levels.len(), 4);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let yaml = r#"
apq:
  queue_full_threshold_pct: 150
"#;
        let err = Config::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));
    }

    #[test]
    fn rejects_high_threshold_below_full_threshold() {
        let yaml = r#"
apq:
  queue_full_threshold_pct: 95
  high_threshold_pct: 90
"#;
        let err = Config::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));
    }

    #[test]
    fn rejects_empty_levels() {
        let yaml = r#"
adm:
  levels: []
"#;
        let err = Config::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, Error::EmptyLevels));
    }

    #[test]
    fn rejects_unknown_action() {
        let yaml = r#"
adm:
  levels:
    - level_id: L1
      actions: [teleport]
"#;
        let err = Config::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }
}
