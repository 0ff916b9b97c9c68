// pareval-metrics/src/table.rs

use crate::metrics::Metrics;

/// Metrics per threshold, kept in sweep order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdTable {
    rows: Vec<(f32, Metrics)>,
}

impl ThresholdTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ThresholdTable {
            rows: Vec::with_capacity(capacity),
        }
    }

    /// Appends the finalised metrics for `threshold`.
    pub fn insert(&mut self, threshold: f32, metrics: Metrics) {
        self.rows.push((threshold, metrics));
    }

    /// Looks up the metrics recorded for exactly `threshold`.
    pub fn get(&self, threshold: f32) -> Option<&Metrics> {
        self.rows
            .iter()
            .find(|(t, _)| *t == threshold)
            .map(|(_, m)| m)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(f32, Metrics)> {
        self.rows.iter()
    }

    pub fn thresholds(&self) -> impl Iterator<Item = f32> + '_ {
        self.rows.iter().map(|(t, _)| *t)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when both tables cover the same thresholds with identical counters
    /// and rates within `tolerance`.
    pub fn agrees_with(&self, other: &ThresholdTable, tolerance: f32) -> bool {
        self.rows.len() == other.rows.len()
            && self.rows.iter().zip(&other.rows).all(|((ta, ma), (tb, mb))| {
                ta == tb
                    && ma.counters == mb.counters
                    && (ma.precision - mb.precision).abs() <= tolerance
                    && (ma.recall - mb.recall).abs() <= tolerance
            })
    }
}

impl<'a> IntoIterator for &'a ThresholdTable {
    type Item = &'a (f32, Metrics);
    type IntoIter = std::slice::Iter<'a, (f32, Metrics)>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
