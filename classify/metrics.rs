//! Binary classification quality metrics over confusion counts.
//!
//! Every ratio is defined as `0.0` when its denominator is zero so that
//! degenerate confusion matrices can still be reported.

use serde::{Deserialize, Serialize};

/// Outcome counts at one decision cutoff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    pub fn_count: usize,
}

impl ConfusionCounts {
    pub fn new(tp: usize, tn: usize, fp: usize, fn_count: usize) -> Self {
        Self {
            tp,
            tn,
            fp,
            fn_count,
        }
    }

    /// Sensitivity = TP / (TP + FN)
    pub fn sensitivity(&self) -> f64 {
        ratio(self.tp as f64, (self.tp + self.fn_count) as f64)
    }

    /// Specificity = TN / (TN + FP)
    pub fn specificity(&self) -> f64 {
        ratio(self.tn as f64, (self.tn + self.fp) as f64)
    }

    /// Matthews Correlation Coefficient
    /// MCC = (TP*TN - FP*FN) / sqrt((TP+FP)(TP+FN)(TN+FP)(TN+FN))
    pub fn mcc(&self) -> f64 {
        let tp = self.tp as f64;
        let tn = self.tn as f64;
        let fp = self.fp as f64;
        let fn_ = self.fn_count as f64;

        let numerator = tp * tn - fp * fn_;
        let denominator = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
        // Rounding can push a perfect score a hair past the bounds.
        ratio(numerator, denominator).clamp(-1.0, 1.0)
    }

    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_count
    }

    /// Derives sensitivity, specificity and MCC from these counts.
    pub fn stats(self) -> ConfusionStats {
        ConfusionStats {
            sensitivity: self.sensitivity(),
            specificity: self.specificity(),
            mcc: self.mcc(),
            counts: self,
        }
    }
}

/// Confusion counts together with the metrics derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfusionStats {
    pub counts: ConfusionCounts,
    pub sensitivity: f64,
    pub specificity: f64,
    pub mcc: f64,
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_known_confusion_matrix() {
        let counts = ConfusionCounts::new(40, 45, 5, 10);
        assert_abs_diff_eq!(counts.sensitivity(), 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(counts.specificity(), 0.9, epsilon = 1e-12);
        let expected = (40.0 * 45.0 - 5.0 * 10.0) / (45.0f64 * 50.0 * 50.0 * 55.0).sqrt();
        assert_abs_diff_eq!(counts.mcc(), expected, epsilon = 1e-12);
        assert_eq!(counts.total(), 100);
    }

    #[test]
    fn test_perfect_and_inverted_classifiers() {
        assert_abs_diff_eq!(ConfusionCounts::new(7, 3, 0, 0).mcc(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ConfusionCounts::new(0, 0, 3, 7).mcc(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_denominators_yield_zero() {
        let empty = ConfusionCounts::default();
        assert_eq!(empty.sensitivity(), 0.0);
        assert_eq!(empty.specificity(), 0.0);
        assert_eq!(empty.mcc(), 0.0);

        // No negatives at all: specificity and MCC are undefined.
        let only_positives = ConfusionCounts::new(4, 0, 0, 2);
        assert_eq!(only_positives.specificity(), 0.0);
        assert_eq!(only_positives.mcc(), 0.0);
        assert_abs_diff_eq!(only_positives.sensitivity(), 4.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_metrics_stay_within_bounds() {
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..2000 {
            let counts = ConfusionCounts::new(
                rng.gen_range(0..50),
                rng.gen_range(0..50),
                rng.gen_range(0..50),
                rng.gen_range(0..50),
            );
            let stats = counts.stats();
            assert!((0.0..=1.0).contains(&stats.sensitivity));
            assert!((0.0..=1.0).contains(&stats.specificity));
            assert!((-1.0..=1.0).contains(&stats.mcc));
            assert_eq!(stats.counts, counts);
        }
    }
}
