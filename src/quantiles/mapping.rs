//! Key mappings between positive real values and integer bucket keys.
//!
//! A [`KeyMapping`] guarantees that for every `v` in
//! `(min_possible(), max_possible())`, `|value(key(v)) - v| / v <=
//! relative_accuracy()`. The three [`MappingKind`] variants trade off the
//! cost of computing `key()` against how tightly it tracks the exact
//! logarithmic mapping; `value()` is the same geometric-midpoint formula for
//! all three, since it only depends on the bucket index, not on how that
//! index was derived.

use std::f64::consts::LN_2;

/// Coefficients of the cubic polynomial `p(s) = A*s + B*s^2 + C*s^3`, chosen
/// to minimize the sup-norm of `|p(s) - log2(1+s)|` on `[0, 1)`.
const CUBIC_A: f64 = 6.0 / 35.0;
const CUBIC_B: f64 = -3.0 / 5.0;
const CUBIC_C: f64 = 10.0 / 7.0;

/// Which approximation of the natural logarithm a [`KeyMapping`] uses to
/// turn a value into a bucket key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingKind {
    /// Exact `ln`. Memory-optimal: the fewest buckets for a given accuracy,
    /// at the cost of the most expensive `key()`.
    Logarithmic,
    /// Extracts the base-2 exponent and mantissa from the value's bit
    /// pattern and linearly interpolates the logarithm in between.
    LinearlyInterpolated,
    /// Same exponent/mantissa extraction, but corrects the interpolation
    /// with a cubic polynomial fitted to `log2(1+s)`.
    CubicallyInterpolated,
}

/// A bijection-ish mapping between positive reals and integer bucket keys,
/// parameterized by a relative accuracy `alpha` and an optional integer-like
/// `offset` that slides which keys are assigned to which buckets without
/// changing their width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyMapping {
    kind: MappingKind,
    relative_accuracy: f64,
    gamma: f64,
    multiplier: f64,
    offset: f64,
    min_possible: f64,
    max_possible: f64,
}

impl KeyMapping {
    /// Builds a mapping for the given relative accuracy `alpha` in `(0, 1)`,
    /// with no key offset.
    pub fn new(kind: MappingKind, relative_accuracy: f64) -> Self {
        Self::with_offset(kind, relative_accuracy, 0.0)
    }

    /// Builds a mapping with an explicit offset `o`.
    pub fn with_offset(kind: MappingKind, relative_accuracy: f64, offset: f64) -> Self {
        let gamma = (1.0 + relative_accuracy) / (1.0 - relative_accuracy);
        let gamma_ln = gamma.ln();
        KeyMapping {
            kind,
            relative_accuracy,
            gamma,
            multiplier: 1.0 / gamma_ln,
            offset,
            min_possible: f64::MIN_POSITIVE * gamma,
            max_possible: f64::MAX / gamma,
        }
    }

    /// The mapping variant in use.
    pub fn kind(&self) -> MappingKind {
        self.kind
    }

    /// The accuracy guarantee `alpha` this mapping was built with.
    pub fn relative_accuracy(&self) -> f64 {
        self.relative_accuracy
    }

    /// `gamma = (1 + alpha) / (1 - alpha)`, the geometric base of the
    /// bucketing. Two mappings can only be merged if their gammas match.
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// The smallest positive value this mapping can index. Values at or
    /// below this threshold (in absolute value) should be treated as zero.
    pub fn min_possible(&self) -> f64 {
        self.min_possible
    }

    /// The largest value this mapping can index without overflowing.
    pub fn max_possible(&self) -> f64 {
        self.max_possible
    }

    /// Maps a positive value to its integer bucket key.
    ///
    /// `value` is expected to lie in `(min_possible(), max_possible())`;
    /// callers are responsible for routing zero and out-of-range values
    /// elsewhere before calling this.
    pub fn key(&self, value: f64) -> i64 {
        let f = match self.kind {
            MappingKind::Logarithmic => value.ln(),
            MappingKind::LinearlyInterpolated => {
                let (exponent, mantissa) = exponent_and_mantissa(value);
                (exponent as f64 + mantissa) * LN_2
            }
            MappingKind::CubicallyInterpolated => {
                let (exponent, mantissa) = exponent_and_mantissa(value);
                (exponent as f64 + cubic_approx(mantissa)) * LN_2
            }
        };
        (f * self.multiplier).ceil() as i64 + self.offset as i64
    }

    /// Maps a bucket key back to the geometric midpoint of its bucket,
    /// `gamma^(k-o) * 2/(1+gamma)`. This is the same formula for every
    /// mapping kind: it is the inverse of the *exact* logarithmic key at the
    /// bucket midpoint, which is what bounds the relative error regardless
    /// of which approximation produced the key.
    pub fn value(&self, key: i64) -> f64 {
        self.gamma.powf(key as f64 - self.offset) * (2.0 / (1.0 + self.gamma))
    }
}

/// Splits a positive, normal `f64` into its unbiased base-2 exponent and a
/// mantissa in `[0, 1)`, such that `value == 2^exponent * (1 + mantissa)`.
fn exponent_and_mantissa(value: f64) -> (i32, f64) {
    let bits = value.to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as i32 - 1023;
    let mantissa_bits = (bits & 0x000f_ffff_ffff_ffff) | 0x3ff0_0000_0000_0000;
    let mantissa = f64::from_bits(mantissa_bits) - 1.0;
    (exponent, mantissa)
}

/// `p(s) = A*s + B*s^2 + C*s^3`, evaluated with Horner's method.
fn cubic_approx(s: f64) -> f64 {
    s * (CUBIC_A + s * (CUBIC_B + s * CUBIC_C))
}
