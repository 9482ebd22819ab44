//! sketch_oxide: mergeable, relative-error quantile sketches.
//!
//! This crate implements the DDSketch family (VLDB 2019, relative-error
//! quantiles via geometric bucketing) and GKArray, a mergeable variant of
//! the Greenwald-Khanna rank-error summary. Both support combining sketches
//! built independently across workers or hosts without mutating either
//! input.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod common;
pub mod quantiles;

pub use common::{Result, SketchError};

/// Error types and result aliases for sketch operations
pub mod error {
    pub use crate::common::{Result, SketchError};
}

pub use quantiles::{
    CollapsingHighestDenseStore, CollapsingLowestDenseStore, DDSketch, DenseStore, GKArray,
    KeyMapping, MappingKind, Store,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_round_trips_a_ddsketch_quantile() {
        let mut dd = DDSketch::with_default_accuracy();
        for i in 1..=100 {
            dd.add_value(i as f64).unwrap();
        }
        assert!(dd.get_quantile_value(0.5).is_some());
    }

    #[test]
    fn library_round_trips_a_gkarray_quantile() {
        let mut gk = GKArray::with_default_epsilon();
        for i in 1..=100 {
            gk.add(i as f64).unwrap();
        }
        assert!(gk.quantile(0.5).is_some());
    }
}
