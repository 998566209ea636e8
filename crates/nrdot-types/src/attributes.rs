use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A scalar attribute value. Attribute maps are `string -> scalar`; nested structures
/// are explicitly out of scope for this pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl AttributeValue {
    /// A canonical textual form used by the entropy scorer and by aggregation
    /// bucketing; corrupt or missing values are treated as the empty string upstream.
    pub fn as_canonical_str(&self) -> String {
        match self {
            AttributeValue::String(s) => s.clone(),
            AttributeValue::Int(i) => i.to_string(),
            AttributeValue::Float(f) => f.to_string(),
            AttributeValue::Bool(b) => b.to_string(),
        }
    }
}

/// An attribute map. `BTreeMap` is used rather than `HashMap` so that iteration order
/// is deterministic, which in turn makes [`crate::AttributeKeySet`] derivation
/// reproducible across runs.
pub type AttributeMap = BTreeMap<String, AttributeValue>;
