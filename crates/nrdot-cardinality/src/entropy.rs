use std::collections::HashMap;

/// Normalization ceiling for information content, in bits. A value observed with
/// probability `2^-16` or lower scores the maximum 1.0; this keeps a single
/// vanishingly-rare value from dominating a key-set's mean score.
const ENTROPY_CEILING_BITS: f64 = 16.0;

/// Mild per-label-count factor; saturates at 10 labels.
const LABEL_FACTOR_FLOOR: f64 = 0.8;
const LABEL_FACTOR_SATURATION: usize = 10;

/// Tracks, per attribute name, a running frequency distribution of observed values.
/// Used to compute the "surprise" (information content) of a given (name, value) pair.
#[derive(Default)]
pub struct EntropyTracker {
    by_name: HashMap<String, NameStats>,
}

#[derive(Default)]
struct NameStats {
    total: u64,
    by_value: HashMap<String, u64>,
}

impl EntropyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalized information content of `(name, value)` under the distribution
    /// observed *before* this call. New names or previously-unseen values score 1.0.
    pub fn observe(&mut self, name: &str, value: &str) -> f64 {
        let stats = self.by_name.entry(name.to_string()).or_default();
        let score = match stats.by_value.get(value) {
            None => 1.0,
            Some(&count) => {
                let p = count as f64 / stats.total as f64;
                let bits = -(p.log2());
                (bits / ENTROPY_CEILING_BITS).clamp(0.0, 1.0)
            }
        };

        stats.total += 1;
        *stats.by_value.entry(value.to_string()).or_insert(0) += 1;

        score
    }

    /// The arithmetic mean information content over `pairs`, multiplied by a mild
    /// factor in `[0.8, 1.0]` that grows with the number of labels, saturating at 10.
    pub fn score_keyset(&mut self, pairs: &[(String, String)]) -> f64 {
        if pairs.is_empty() {
            return 1.0;
        }
        let sum: f64 = pairs.iter().map(|(name, value)| self.observe(name, value)).sum();
        let mean = sum / pairs.len() as f64;
        let label_factor = LABEL_FACTOR_FLOOR
            + (1.0 - LABEL_FACTOR_FLOOR) * (pairs.len().min(LABEL_FACTOR_SATURATION) as f64
                / LABEL_FACTOR_SATURATION as f64);
        mean * label_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_value_scores_maximally() {
        let mut tracker = EntropyTracker::new();
        assert_eq!(tracker.observe("service", "checkout"), 1.0);
    }

    #[test]
    fn repeated_common_value_scores_lower() {
        let mut tracker = EntropyTracker::new();
        for _ in 0..100 {
            tracker.observe("service", "checkout");
        }
        let score = tracker.observe("service", "checkout");
        assert!(score < 0.2, "expected low surprise for a dominant value, got {score}");
    }

    #[test]
    fn label_factor_grows_with_label_count() {
        let mut single = EntropyTracker::new();
        let mut many = EntropyTracker::new();
        // both score identical per-pair entropy (all unseen -> 1.0), so the only
        // difference is the label-count factor.
        let one_pair = vec![("a".to_string(), "1".to_string())];
        let ten_pairs: Vec<_> = (0..10).map(|i| (format!("k{i}"), format!("v{i}"))).collect();
        let s1 = single.score_keyset(&one_pair);
        let s2 = many.score_keyset(&ten_pairs);
        assert!(s2 > s1);
    }
}
