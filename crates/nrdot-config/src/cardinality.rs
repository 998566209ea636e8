use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::Error;

/// Configuration for the CardinalityLimiter.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CardinalityConfig {
    /// Upper bound on the number of admitted unique key-sets.
    #[serde(default = "default_max_unique_keysets")]
    #[validate(range(min = 1))]
    pub max_unique_keysets: usize,

    /// Dimensions preserved when aggregating a high-cardinality key-set.
    #[serde(default)]
    pub aggregation_dimensions: Vec<String>,
}

impl Default for CardinalityConfig {
    fn default() -> Self {
        Self {
            max_unique_keysets: default_max_unique_keysets(),
            aggregation_dimensions: Vec::new(),
        }
    }
}

fn default_max_unique_keysets() -> usize {
    65_536
}

impl CardinalityConfig {
    pub(crate) fn validate_nrdot(&self) -> Result<(), Error> {
        self.validate().map_err(|e| Error::InvalidValue {
            field: "cardinality".into(),
            message: e.to_string(),
        })
    }
}
