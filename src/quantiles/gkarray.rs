//! GKArray: a mergeable variant of the Greenwald-Khanna epsilon-approximate
//! quantile summary.
//!
//! Unlike the streaming GK algorithm, which only supports a single pass,
//! this variant supports merging independently-built summaries by
//! reconstructing boundary-preserving entries from the sketch being merged
//! in before compressing them into `self`.

use crate::common::{validation, Result, SketchError};

/// Epsilon used when none is specified.
pub const DEFAULT_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    val: f64,
    g: i64,
    delta: i64,
}

/// A Greenwald-Khanna summary: a sorted array of `(value, g, delta)`
/// tuples plus an unsorted buffer of recently-added values, periodically
/// folded into the sorted array by [`GKArray::merge_compress`].
#[derive(Debug, Clone)]
pub struct GKArray {
    eps: f64,
    entries: Vec<Entry>,
    incoming: Vec<f64>,
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl GKArray {
    /// Builds an empty summary with the given rank-error bound `epsilon` in
    /// `(0, 1)`.
    pub fn new(epsilon: f64) -> Result<Self> {
        validation::validate_probability(epsilon, "epsilon")?;
        Ok(GKArray {
            eps: epsilon,
            entries: Vec::new(),
            incoming: Vec::new(),
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        })
    }

    /// Builds an empty summary with the default epsilon.
    pub fn with_default_epsilon() -> Self {
        Self::new(DEFAULT_EPSILON).expect("default epsilon is valid")
    }

    /// The rank-error bound this summary was built with.
    pub fn epsilon(&self) -> f64 {
        self.eps
    }

    /// Total number of values added so far.
    pub fn num_values(&self) -> u64 {
        self.count
    }

    /// Sum of all ingested values.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Mean of all ingested values, or `0.0` if empty.
    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Smallest value added, or `None` if empty.
    pub fn min(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.min)
        }
    }

    /// Largest value added, or `None` if empty.
    pub fn max(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.max)
        }
    }

    /// Whether any values have been added.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of entries currently held, flushing the incoming buffer first
    /// if necessary.
    pub fn size(&mut self) -> usize {
        if !self.incoming.is_empty() {
            self.merge_compress(Vec::new());
        }
        self.entries.len()
    }

    /// Adds a value to the summary, buffering it until the next periodic
    /// compression pass.
    pub fn add(&mut self, value: f64) -> Result<()> {
        if value.is_nan() || value.is_infinite() {
            return Err(SketchError::InvalidParameter {
                param: "value".to_string(),
                value: value.to_string(),
                constraint: "must be finite".to_string(),
            });
        }
        self.incoming.push(value);
        self.count += 1;
        self.sum += value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
        let period = (1.0 / self.eps).floor() as u64 + 1;
        if self.count % period == 0 {
            self.merge_compress(Vec::new());
        }
        Ok(())
    }

    /// Merges `extra_entries` (already `(g, delta)`-tagged, e.g. from
    /// another summary's [`GKArray::merge`]) together with the buffered
    /// incoming values into `self.entries`, dropping any entry whose
    /// removal would not break the `epsilon` rank-error bound.
    fn merge_compress(&mut self, extra_entries: Vec<Entry>) {
        let removal_threshold = (2.0 * self.eps * (self.count as f64 - 1.0)).floor() as i64;

        let mut incoming: Vec<Entry> = self
            .incoming
            .iter()
            .map(|&val| Entry { val, g: 1, delta: 0 })
            .collect();
        incoming.extend(extra_entries);
        incoming.sort_by(|a, b| a.val.partial_cmp(&b.val).unwrap());

        let mut entries = std::mem::take(&mut self.entries);
        let mut merged = Vec::with_capacity(incoming.len() + entries.len());
        let (mut i, mut j) = (0usize, 0usize);

        while i < incoming.len() || j < entries.len() {
            if i == incoming.len() {
                if j + 1 < entries.len()
                    && entries[j].g + entries[j + 1].g + entries[j + 1].delta <= removal_threshold
                {
                    entries[j + 1].g += entries[j].g;
                } else {
                    merged.push(entries[j].clone());
                }
                j += 1;
            } else if j == entries.len() {
                if i + 1 < incoming.len()
                    && incoming[i].g + incoming[i + 1].g + incoming[i + 1].delta <= removal_threshold
                {
                    incoming[i + 1].g += incoming[i].g;
                } else {
                    merged.push(incoming[i].clone());
                }
                i += 1;
            } else if incoming[i].val < entries[j].val {
                if incoming[i].g + entries[j].g + entries[j].delta <= removal_threshold {
                    entries[j].g += incoming[i].g;
                } else {
                    incoming[i].delta = entries[j].g + entries[j].delta - incoming[i].g;
                    merged.push(incoming[i].clone());
                }
                i += 1;
            } else {
                if j + 1 < entries.len()
                    && entries[j].g + entries[j + 1].g + entries[j + 1].delta <= removal_threshold
                {
                    entries[j + 1].g += entries[j].g;
                } else {
                    merged.push(entries[j].clone());
                }
                j += 1;
            }
        }

        self.entries = merged;
        self.incoming.clear();
    }

    /// Overwrites `self` with a deep, compressed copy of `other`. `other` is
    /// left untouched.
    pub fn copy(&mut self, other: &GKArray) {
        let mut flushed = other.clone();
        if !flushed.incoming.is_empty() {
            flushed.merge_compress(Vec::new());
        }
        self.eps = flushed.eps;
        self.entries = flushed.entries;
        self.incoming = Vec::new();
        self.count = flushed.count;
        self.sum = flushed.sum;
        self.min = flushed.min;
        self.max = flushed.max;
    }

    /// Folds `other` into `self`. `other` is left untouched: a deep,
    /// compressed copy of it is taken internally and the synthetic
    /// boundary entries for the merge are derived from that copy instead of
    /// mutating the argument, unlike the textbook streaming algorithm.
    pub fn merge(&mut self, other: &GKArray) -> Result<()> {
        if (self.eps - other.eps).abs() > f64::EPSILON {
            return Err(SketchError::IncompatibleSketches {
                reason: format!(
                    "cannot merge GKArrays with epsilon {} and {}",
                    self.eps, other.eps
                ),
            });
        }

        if other.count == 0 {
            return Ok(());
        }
        if self.count == 0 {
            self.copy(other);
            return Ok(());
        }

        let mut other_copy = other.clone();
        other_copy.merge_compress(Vec::new());

        let spread = (other_copy.eps * (other_copy.count as f64 - 1.0)).floor() as i64;
        let n = other_copy.entries.len();
        let mut extra = Vec::with_capacity(n + 1);
        if n > 0 {
            let g0 = other_copy.entries[0].g + other_copy.entries[0].delta - spread - 1;
            if g0 > 0 {
                extra.push(Entry {
                    val: other_copy.min,
                    g: g0,
                    delta: 0,
                });
            }
            for k in 0..n - 1 {
                let g = other_copy.entries[k + 1].g + other_copy.entries[k + 1].delta
                    - other_copy.entries[k].delta;
                if g > 0 {
                    extra.push(Entry {
                        val: other_copy.entries[k].val,
                        g,
                        delta: 0,
                    });
                }
            }
            let g_last = spread + 1 - other_copy.entries[n - 1].delta;
            if g_last > 0 {
                extra.push(Entry {
                    val: other_copy.entries[n - 1].val,
                    g: g_last,
                    delta: 0,
                });
            }
        }

        self.count += other_copy.count;
        self.sum += other_copy.sum;
        if other_copy.min < self.min {
            self.min = other_copy.min;
        }
        if other_copy.max > self.max {
            self.max = other_copy.max;
        }

        self.merge_compress(extra);
        Ok(())
    }

    /// Returns an epsilon-approximate value at quantile `q` (`0.0..=1.0`),
    /// or `None` for an out-of-range quantile or an empty summary. Flushes
    /// the incoming buffer first if necessary.
    pub fn quantile(&mut self, q: f64) -> Option<f64> {
        if !(0.0..=1.0).contains(&q) || self.count == 0 {
            return None;
        }
        if !self.incoming.is_empty() {
            self.merge_compress(Vec::new());
        }

        let rank = (q * (self.count as f64 - 1.0)).floor() as i64 + 1;
        let spread = (self.eps * (self.count as f64 - 1.0)).floor() as i64;

        let mut g_sum: i64 = 0;
        let mut i = 0usize;
        while i < self.entries.len() {
            g_sum += self.entries[i].g;
            if g_sum + self.entries[i].delta > rank + spread {
                break;
            }
            i += 1;
        }

        if i == 0 {
            self.min()
        } else {
            Some(self.entries[i - 1].val)
        }
    }

    /// Returns an epsilon-approximate value for each quantile in `qs`,
    /// preserving order.
    pub fn quantiles(&mut self, qs: &[f64]) -> Vec<Option<f64>> {
        qs.iter().map(|&q| self.quantile(q)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_summary_has_no_quantiles() {
        let mut gk = GKArray::with_default_epsilon();
        assert!(gk.is_empty());
        assert_eq!(gk.quantile(0.5), None);
    }

    #[test]
    fn single_value_quantiles_equal_that_value() {
        let mut gk = GKArray::with_default_epsilon();
        gk.add(7.0).unwrap();
        assert_eq!(gk.quantile(0.0), Some(7.0));
        assert_eq!(gk.quantile(0.5), Some(7.0));
        assert_eq!(gk.quantile(1.0), Some(7.0));
    }

    #[test]
    fn quantile_within_epsilon_rank_error_for_sorted_data() {
        let eps = 0.02;
        let mut gk = GKArray::new(eps).unwrap();
        let n = 10_000;
        for i in 1..=n {
            gk.add(i as f64).unwrap();
        }
        let q = 0.5;
        let estimate = gk.quantile(q).unwrap();
        let true_rank = (q * (n - 1) as f64).round();
        let estimated_rank = estimate - 1.0;
        assert!((estimated_rank - true_rank).abs() <= eps * n as f64);
    }

    #[test]
    fn merge_preserves_total_count() {
        let eps = 0.01;
        let mut a = GKArray::new(eps).unwrap();
        let mut b = GKArray::new(eps).unwrap();
        for i in 1..=5000 {
            a.add(i as f64).unwrap();
        }
        for i in 5001..=10000 {
            b.add(i as f64).unwrap();
        }
        let b_count_before = b.num_values();
        a.merge(&b).unwrap();
        assert_eq!(b.num_values(), b_count_before);
        assert_eq!(a.num_values(), 10000);
    }

    #[test]
    fn merge_does_not_mutate_source() {
        let mut a = GKArray::with_default_epsilon();
        let mut b = GKArray::with_default_epsilon();
        for i in 1..=500 {
            b.add(i as f64).unwrap();
        }
        let b_clone_entries_len = {
            let mut clone = b.clone();
            clone.size()
        };
        a.merge(&b).unwrap();
        let still_same = {
            let mut clone = b.clone();
            clone.size()
        };
        assert_eq!(b_clone_entries_len, still_same);
    }

    #[test]
    fn merge_into_empty_summary_copies_data() {
        let mut a = GKArray::with_default_epsilon();
        let mut b = GKArray::with_default_epsilon();
        b.add(1.0).unwrap();
        b.add(2.0).unwrap();
        a.merge(&b).unwrap();
        assert_eq!(a.num_values(), 2);
        assert_eq!(a.min(), Some(1.0));
    }

    #[test]
    fn merge_rejects_mismatched_epsilon() {
        let mut a = GKArray::new(0.01).unwrap();
        let b = GKArray::new(0.05).unwrap();
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn invalid_epsilon_is_rejected() {
        assert!(GKArray::new(0.0).is_err());
        assert!(GKArray::new(1.0).is_err());
    }

    #[test]
    fn infinite_and_nan_values_are_rejected() {
        let mut gk = GKArray::with_default_epsilon();
        assert!(gk.add(f64::NAN).is_err());
        assert!(gk.add(f64::INFINITY).is_err());
        assert!(gk.add(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn out_of_range_quantile_returns_none() {
        let mut gk = GKArray::with_default_epsilon();
        gk.add(1.0).unwrap();
        assert_eq!(gk.quantile(-0.1), None);
        assert_eq!(gk.quantile(1.1), None);
    }
}
