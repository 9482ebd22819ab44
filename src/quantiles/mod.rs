//! Mergeable, relative-error quantile sketches.
//!
//! # Algorithms
//!
//! - [`DDSketch`] - relative-error quantiles via geometric bucketing (VLDB 2019)
//! - [`GKArray`] - the Greenwald-Khanna rank-error summary, made mergeable
//!
//! ## Choosing between them
//!
//! `DDSketch` bounds the *relative* error of the returned value (`|estimate -
//! true| / true <= alpha`); it is the right choice when values span several
//! orders of magnitude, as is typical of latencies or request sizes.
//! `GKArray` instead bounds the *rank* error (how far off the returned
//! value's position in sorted order can be); it is the right choice when
//! accuracy should be uniform across the value range rather than scaling
//! with magnitude.
//!
//! Both support merging sketches built independently (e.g. one per worker)
//! without mutating either input.
//!
//! ```
//! use sketch_oxide::quantiles::DDSketch;
//!
//! let mut dd = DDSketch::new(0.01).unwrap();
//! for i in 1..=1000 {
//!     dd.add_value(i as f64).unwrap();
//! }
//! let median = dd.get_quantile_value(0.5).unwrap();
//! assert!((median - 500.0).abs() / 500.0 <= 0.01);
//! ```

mod ddsketch;
mod gkarray;
mod mapping;
mod store;

pub use ddsketch::{DDSketch, DEFAULT_BIN_LIMIT, DEFAULT_RELATIVE_ACCURACY};
pub use gkarray::{GKArray, DEFAULT_EPSILON};
pub use mapping::{KeyMapping, MappingKind};
pub use store::{
    CollapsingHighestDenseStore, CollapsingLowestDenseStore, DenseStore, Store, DEFAULT_CHUNK_SIZE,
};
