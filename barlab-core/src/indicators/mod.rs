//! Indicator transforms and their binding to a price series.
//!
//! Transforms are pure functions: a price array in, a same-length numeric
//! series out. They are computed once, before the bar loop, and bound to the
//! series through [`IndicatorHandle`]. During the loop a strategy only ever
//! sees a lagged [`IndicatorView`] ending at the current bar.

pub mod binding;
pub mod crossover;
pub mod ema;
pub mod mcginley;

pub use binding::{BindError, IndicatorHandle, IndicatorSet, IndicatorView};
pub use crossover::crossover;
pub use ema::{exponential_smoothing, Ema};
pub use mcginley::{adaptive_smoothing, McGinley};

/// A named, stateless transform over a price array.
///
/// # Look-ahead contamination guard
/// No output value at index t may depend on input from index t+1 or later.
/// Every implementation must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Binding name (e.g., "ema_51").
    fn name(&self) -> &str;

    /// Number of leading positions reported as undefined (warm-up).
    fn lookback(&self) -> usize;

    /// Compute over the whole input. Output has the input's length, with the
    /// first `lookback()` positions set to `f64::NAN`.
    fn compute(&self, values: &[f64]) -> Vec<f64>;
}

/// Overwrite the first `lookback` positions with NaN.
pub(crate) fn mask_warmup(values: &mut [f64], lookback: usize) {
    for v in values.iter_mut().take(lookback) {
        *v = f64::NAN;
    }
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
