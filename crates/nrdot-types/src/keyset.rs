use std::hash::{Hash, Hasher};

use crate::AttributeMap;

/// The canonical, order-independent set of (name, value) pairs identifying a unique
/// series. Two records with identical key-sets collapse onto the same
/// [`KeySetEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeKeySet {
    /// Sorted `(name, canonical value)` pairs. Sorting makes equality and hashing
    /// order-independent without needing a custom `Hash` impl over a `BTreeMap`.
    pairs: Vec<(String, String)>,
}

impl AttributeKeySet {
    /// Builds a key-set from an attribute map, canonicalizing each value.
    pub fn from_attributes(attributes: &AttributeMap) -> Self {
        let mut pairs: Vec<(String, String)> = attributes
            .iter()
            .map(|(name, value)| (name.clone(), value.as_canonical_str()))
            .collect();
        pairs.sort();
        Self { pairs }
    }

    /// Builds a key-set retaining only `dimensions`, with all other names collapsed
    /// into a single synthetic `__other__` bucket. Used by the CardinalityLimiter's
    /// aggregation tier.
    pub fn aggregated(&self, dimensions: &[String], prefix_len: usize) -> Self {
        let mut pairs = Vec::with_capacity(self.pairs.len());
        let mut collapsed_any = false;
        for (name, value) in &self.pairs {
            if dimensions.iter().any(|d| d == name) {
                pairs.push((name.clone(), value.clone()));
            } else {
                let mut prefix: String = value.chars().take(prefix_len).collect();
                prefix.push('*');
                pairs.push((name.clone(), prefix));
                collapsed_any = true;
            }
        }
        let _ = collapsed_any;
        pairs.sort();
        Self { pairs }
    }

    /// The pairs making up this key-set, in canonical sorted order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// A stable 64-bit hash of this key-set's canonical form, used as the table key
    /// and as the `key_hash` field of [`KeySetEntry`].
    pub fn stable_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.pairs.hash(&mut hasher);
        hasher.finish()
    }
}

/// One per admitted unique key-set, owned exclusively by the CardinalityLimiter.
#[derive(Debug, Clone)]
pub struct KeySetEntry {
    pub key_hash: u64,
    pub last_seen_nanos: u64,
    pub access_count: u64,
    pub entropy_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AttributeValue;

    fn attrs(pairs: &[(&str, &str)]) -> AttributeMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), AttributeValue::String(v.to_string())))
            .collect()
    }

    #[test]
    fn order_independent_equality() {
        let a = AttributeKeySet::from_attributes(&attrs(&[("a", "1"), ("b", "2")]));
        let b = AttributeKeySet::from_attributes(&attrs(&[("b", "2"), ("a", "1")]));
        assert_eq!(a, b);
        assert_eq!(a.stable_hash(), b.stable_hash());
    }

    #[test]
    fn aggregation_preserves_dimensions_and_collapses_rest() {
        let ks = AttributeKeySet::from_attributes(&attrs(&[
            ("service", "checkout"),
            ("request_id", "a1b2c3d4e5f6"),
        ]));
        let dims = vec!["service".to_string()];
        let agg = ks.aggregated(&dims, 5);
        let map: std::collections::BTreeMap<_, _> = agg.pairs().iter().cloned().collect();
        assert_eq!(map.get("service").unwrap(), "checkout");
        assert_eq!(map.get("request_id").unwrap(), "a1b2c*");
    }
}
