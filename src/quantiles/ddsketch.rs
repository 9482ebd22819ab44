//! DDSketch: a mergeable, relative-error quantile sketch (VLDB 2019).

use crate::common::{validation, Result, SketchError};
use crate::quantiles::mapping::{KeyMapping, MappingKind};
use crate::quantiles::store::{CollapsingHighestDenseStore, CollapsingLowestDenseStore, DenseStore, Store};

/// Relative accuracy used when none is specified.
pub const DEFAULT_RELATIVE_ACCURACY: f64 = 0.01;
/// Bin limit used by the collapsing constructors when none is specified.
pub const DEFAULT_BIN_LIMIT: usize = 2048;

/// A DDSketch: buckets values geometrically by `(1+alpha)/(1-alpha)` so that
/// any two values in the same bucket differ by no more than `2*alpha`
/// relatively, giving quantile estimates with a guaranteed relative error.
///
/// Positive and negative values are tracked in separate stores (mirrored
/// around zero); values within `mapping.min_possible()` of zero are counted
/// separately rather than bucketed, since no finite key could represent
/// them accurately. Two sketches merge only if built with the same
/// `relative_accuracy` and the same kind of store.
#[derive(Debug, Clone)]
pub struct DDSketch {
    mapping: KeyMapping,
    positive_store: Store,
    negative_store: Store,
    zero_count: f64,
    count: f64,
    sum: f64,
    min: f64,
    max: f64,
}

impl DDSketch {
    /// An unbounded DDSketch: grows its stores without limit, so accuracy
    /// never degrades but memory is not capped.
    pub fn new(relative_accuracy: f64) -> Result<Self> {
        validation::validate_probability(relative_accuracy, "relative_accuracy")?;
        Ok(Self::build(
            relative_accuracy,
            Store::Dense(DenseStore::new()),
            Store::Dense(DenseStore::new()),
        ))
    }

    /// Builds a DDSketch with the default 1% relative accuracy.
    pub fn with_default_accuracy() -> Self {
        Self::new(DEFAULT_RELATIVE_ACCURACY).expect("default relative accuracy is valid")
    }

    /// A bounded-memory DDSketch that collapses its lowest bins once
    /// `bin_limit` bins are in use. Accuracy is lost on the smallest values
    /// first; for the default bin limit this is unlikely unless the data is
    /// distributed with a tail heavier than any subexponential distribution.
    pub fn log_collapsing_lowest(relative_accuracy: f64, bin_limit: usize) -> Result<Self> {
        validation::validate_probability(relative_accuracy, "relative_accuracy")?;
        Ok(Self::build(
            relative_accuracy,
            Store::CollapsingLowest(CollapsingLowestDenseStore::new(bin_limit)),
            Store::CollapsingLowest(CollapsingLowestDenseStore::new(bin_limit)),
        ))
    }

    /// As [`DDSketch::log_collapsing_lowest`], but collapses the highest
    /// bins instead, losing accuracy on the largest values first.
    pub fn log_collapsing_highest(relative_accuracy: f64, bin_limit: usize) -> Result<Self> {
        validation::validate_probability(relative_accuracy, "relative_accuracy")?;
        Ok(Self::build(
            relative_accuracy,
            Store::CollapsingHighest(CollapsingHighestDenseStore::new(bin_limit)),
            Store::CollapsingHighest(CollapsingHighestDenseStore::new(bin_limit)),
        ))
    }

    fn build(relative_accuracy: f64, positive_store: Store, negative_store: Store) -> Self {
        DDSketch {
            mapping: KeyMapping::new(MappingKind::Logarithmic, relative_accuracy),
            positive_store,
            negative_store,
            zero_count: 0.0,
            count: 0.0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// The relative accuracy guarantee `alpha` this sketch was built with.
    pub fn relative_accuracy(&self) -> f64 {
        self.mapping.relative_accuracy()
    }

    /// Total weight of values added so far.
    pub fn count(&self) -> f64 {
        self.count
    }

    /// Alias for [`DDSketch::count`], matching the paper's terminology.
    pub fn num_values(&self) -> f64 {
        self.count
    }

    /// Sum of all ingested values (each weighted by its own weight).
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Mean of all ingested values, or `0.0` if the sketch is empty.
    pub fn avg(&self) -> f64 {
        if self.count == 0.0 {
            0.0
        } else {
            self.sum / self.count
        }
    }

    /// Smallest value added, or `None` if the sketch is empty.
    pub fn min(&self) -> Option<f64> {
        if self.count == 0.0 {
            None
        } else {
            Some(self.min)
        }
    }

    /// Largest value added, or `None` if the sketch is empty.
    pub fn max(&self) -> Option<f64> {
        if self.count == 0.0 {
            None
        } else {
            Some(self.max)
        }
    }

    /// Whether any values have been added.
    pub fn is_empty(&self) -> bool {
        self.count == 0.0
    }

    /// Adds `value` once.
    pub fn add_value(&mut self, value: f64) -> Result<()> {
        self.add(value, 1.0)
    }

    /// Adds `value` with the given `weight` (must be finite and positive).
    /// Values within `mapping.min_possible()` of zero are tallied
    /// separately rather than bucketed.
    pub fn add(&mut self, value: f64, weight: f64) -> Result<()> {
        validation::validate_weight(weight)?;
        if value.is_nan() || value.is_infinite() {
            return Err(SketchError::InvalidParameter {
                param: "value".to_string(),
                value: value.to_string(),
                constraint: "must be finite".to_string(),
            });
        }

        if value > self.mapping.min_possible() {
            let key = self.mapping.key(value);
            self.positive_store.add(key, weight);
        } else if value < -self.mapping.min_possible() {
            let key = self.mapping.key(-value);
            self.negative_store.add(key, weight);
        } else {
            self.zero_count += weight;
        }

        self.count += weight;
        self.sum += value * weight;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
        Ok(())
    }

    /// Estimates the value at quantile `q` (`0.0..=1.0`). Returns `None` for
    /// an out-of-range quantile or an empty sketch.
    pub fn get_quantile_value(&self, q: f64) -> Option<f64> {
        if !(0.0..=1.0).contains(&q) || self.count == 0.0 {
            return None;
        }
        if q == 0.0 {
            return self.min();
        }
        if q == 1.0 {
            return self.max();
        }

        let rank = q * (self.count - 1.0);
        let negative_count = self.negative_store.count();

        let quantile_value = if rank < negative_count {
            let reversed_rank = negative_count - rank - 1.0;
            let key = self.negative_store.key_at_rank(reversed_rank, false);
            -self.mapping.value(key)
        } else if rank < negative_count + self.zero_count {
            0.0
        } else {
            let key = self
                .positive_store
                .key_at_rank(rank - self.zero_count - negative_count, true);
            self.mapping.value(key)
        };

        Some(quantile_value.max(self.min))
    }

    /// Estimates every quantile in `qs`, preserving order.
    pub fn get_quantile_values(&self, qs: &[f64]) -> Vec<Option<f64>> {
        qs.iter().map(|&q| self.get_quantile_value(q)).collect()
    }

    /// Whether `self` and `other` can be merged: same relative accuracy
    /// (hence the same `gamma`) and the same kind of store.
    pub fn mergeable(&self, other: &DDSketch) -> bool {
        (self.mapping.gamma() - other.mapping.gamma()).abs() < 1e-12
            && std::mem::discriminant(&self.positive_store)
                == std::mem::discriminant(&other.positive_store)
    }

    /// Folds `other` into `self`. `other` is left untouched. Fails with
    /// [`SketchError::IncompatibleSketches`] if the two sketches were built
    /// with different relative accuracies or different store kinds.
    pub fn merge(&mut self, other: &DDSketch) -> Result<()> {
        if !self.mergeable(other) {
            return Err(SketchError::IncompatibleSketches {
                reason: format!(
                    "cannot merge DDSketches with gamma {} and {}",
                    self.mapping.gamma(),
                    other.mapping.gamma()
                ),
            });
        }

        if other.count == 0.0 {
            return Ok(());
        }
        if self.count == 0.0 {
            self.copy(other);
            return Ok(());
        }

        self.positive_store.merge(&other.positive_store)?;
        self.negative_store.merge(&other.negative_store)?;
        self.zero_count += other.zero_count;
        self.count += other.count;
        self.sum += other.sum;
        if other.min < self.min {
            self.min = other.min;
        }
        if other.max > self.max {
            self.max = other.max;
        }
        Ok(())
    }

    /// Overwrites `self` with a deep copy of `other`.
    pub fn copy(&mut self, other: &DDSketch) {
        self.mapping = other.mapping;
        self.positive_store.copy(&other.positive_store);
        self.negative_store.copy(&other.negative_store);
        self.zero_count = other.zero_count;
        self.count = other.count;
        self.sum = other.sum;
        self.min = other.min;
        self.max = other.max;
    }

    /// Cumulative histogram view over the positive store: for each edge in
    /// `edges` (ascending, positive), the total weight of positive values at
    /// or below it. A read-only walk over the bins, not part of the
    /// sketch's internal state.
    pub fn positive_histogram(&self, edges: &[f64]) -> Vec<(f64, f64)> {
        let keys: Vec<i64> = edges.iter().map(|&e| self.mapping.key(e)).collect();
        let cumulative = self.positive_store.hist(&keys);
        edges.iter().copied().zip(cumulative).collect()
    }
}
