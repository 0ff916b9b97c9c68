// pareval-metrics/src/metrics.rs

use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Raw confusion counts for one threshold, accumulated by one worker or reduced
/// across all workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Predicted positive and labelled positive.
    pub correct_p: u64,
    /// Labelled positive and predicted positive. Tracked separately from
    /// `correct_p` so precision and recall keep independent numerators.
    pub correct_r: u64,
    /// Predicted positive.
    pub total_p: u64,
    /// Labelled positive.
    pub total_r: u64,
}

impl Counters {
    /// Records one scored example. A score at or above `threshold` is a
    /// positive prediction.
    #[inline]
    pub fn observe(&mut self, score: f32, is_positive: bool, threshold: f32) {
        let predicted = score >= threshold;
        if predicted {
            self.total_p += 1;
            if is_positive {
                self.correct_p += 1;
            }
        }
        if is_positive {
            self.total_r += 1;
            if predicted {
                self.correct_r += 1;
            }
        }
    }
}

impl Add for Counters {
    type Output = Counters;

    fn add(mut self, rhs: Counters) -> Counters {
        self += rhs;
        self
    }
}

impl AddAssign for Counters {
    fn add_assign(&mut self, rhs: Counters) {
        self.correct_p += rhs.correct_p;
        self.correct_r += rhs.correct_r;
        self.total_p += rhs.total_p;
        self.total_r += rhs.total_r;
    }
}

impl Sum for Counters {
    fn sum<I: Iterator<Item = Counters>>(iter: I) -> Counters {
        iter.fold(Counters::default(), Add::add)
    }
}

impl<'a> Sum<&'a Counters> for Counters {
    fn sum<I: Iterator<Item = &'a Counters>>(iter: I) -> Counters {
        iter.copied().sum()
    }
}

/// Finalised metrics for one threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metrics {
    pub counters: Counters,
    pub precision: f32,
    pub recall: f32,
}

impl Metrics {
    /// Derives precision and recall from reduced counters.
    ///
    /// Both rates are 0 when their denominator is 0, never NaN.
    pub fn from_counters(counters: Counters) -> Self {
        Metrics {
            counters,
            precision: ratio(counters.correct_p, counters.total_p),
            recall: ratio(counters.correct_r, counters.total_r),
        }
    }
}

impl From<Counters> for Metrics {
    fn from(counters: Counters) -> Self {
        Metrics::from_counters(counters)
    }
}

#[inline]
fn ratio(numerator: u64, denominator: u64) -> f32 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f32 / denominator as f32
    }
}

/// Best precision and best recall seen so far across a sweep, with the
/// threshold at which each was first reached.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OptimalMetrics {
    pub max_precision: f32,
    pub precision_threshold: f32,
    pub max_recall: f32,
    pub recall_threshold: f32,
}

impl OptimalMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one finalised threshold into the running optimum. Only strictly
    /// better values replace the current best, so ties keep the earlier threshold.
    pub fn update(&mut self, metrics: &Metrics, threshold: f32) {
        if metrics.precision > self.max_precision {
            self.max_precision = metrics.precision;
            self.precision_threshold = threshold;
        }
        if metrics.recall > self.max_recall {
            self.max_recall = metrics.recall;
            self.recall_threshold = threshold;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_precision(precision: f32) -> Metrics {
        Metrics {
            precision,
            ..Metrics::default()
        }
    }

    #[test]
    fn test_observe_counts() {
        let mut c = Counters::default();
        c.observe(0.9, true, 0.5); // true positive
        c.observe(0.9, false, 0.5); // false positive
        c.observe(0.1, true, 0.5); // false negative
        c.observe(0.1, false, 0.5); // true negative
        c.observe(0.5, true, 0.5); // on the threshold counts as predicted
        assert_eq!(
            c,
            Counters {
                correct_p: 2,
                correct_r: 2,
                total_p: 3,
                total_r: 3,
            }
        );
    }

    #[test]
    fn test_precision_zero_when_nothing_predicted() {
        let mut c = Counters::default();
        c.observe(0.1, true, 0.9);
        let m = Metrics::from_counters(c);
        assert_eq!(m.precision, 0.0);
        assert!(!m.precision.is_nan());
        assert_eq!(m.recall, 0.0);
    }

    #[test]
    fn test_recall_zero_when_no_positive_labels() {
        let mut c = Counters::default();
        c.observe(0.9, false, 0.5);
        let m = Metrics::from_counters(c);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert!(!m.recall.is_nan());
    }

    #[test]
    fn test_rates_within_unit_interval() {
        let scores = [0.0f32, 0.05, 0.2, 0.35, 0.5, 0.65, 0.8, 1.0];
        for threshold in [0.0f32, 0.1, 0.5, 0.9, 1.0] {
            let mut c = Counters::default();
            for (i, score) in scores.iter().enumerate() {
                c.observe(*score, i % 3 == 0, threshold);
            }
            let m = Metrics::from_counters(c);
            assert!((0.0..=1.0).contains(&m.precision));
            assert!((0.0..=1.0).contains(&m.recall));
        }
    }

    #[test]
    fn test_counters_sum() {
        let parts = [
            Counters {
                correct_p: 1,
                correct_r: 2,
                total_p: 3,
                total_r: 4,
            },
            Counters {
                correct_p: 10,
                correct_r: 20,
                total_p: 30,
                total_r: 40,
            },
            Counters::default(),
        ];
        let total: Counters = parts.iter().sum();
        assert_eq!(
            total,
            Counters {
                correct_p: 11,
                correct_r: 22,
                total_p: 33,
                total_r: 44,
            }
        );
    }

    #[test]
    fn test_optimal_tracks_maximum() {
        let mut optimal = OptimalMetrics::new();
        for (threshold, precision) in [(0.1, 0.4), (0.2, 0.9), (0.3, 0.6)] {
            optimal.update(&with_precision(precision), threshold);
        }
        assert_eq!(optimal.max_precision, 0.9);
        assert_eq!(optimal.precision_threshold, 0.2);
    }

    #[test]
    fn test_optimal_ties_keep_earliest_threshold() {
        let mut optimal = OptimalMetrics::new();
        for (threshold, precision) in [(0.1, 0.5), (0.2, 0.7), (0.3, 0.7), (0.4, 0.2)] {
            optimal.update(&with_precision(precision), threshold);
        }
        assert_eq!(optimal.max_precision, 0.7);
        assert_eq!(optimal.precision_threshold, 0.2);
    }

    #[test]
    fn test_optimal_precision_and_recall_independent() {
        let mut optimal = OptimalMetrics::new();
        let first = Metrics {
            precision: 0.3,
            recall: 1.0,
            ..Default::default()
        };
        let second = Metrics {
            precision: 0.8,
            recall: 0.4,
            ..Default::default()
        };
        optimal.update(&first, 0.1);
        optimal.update(&second, 0.6);
        assert_eq!((optimal.max_precision, optimal.precision_threshold), (0.8, 0.6));
        assert_eq!((optimal.max_recall, optimal.recall_threshold), (1.0, 0.1));
    }
}
