//! Exponential smoothing (EMA).
//!
//! alpha = 2 / (period + 1)
//! v[0] = x[0]
//! v[t] = alpha * x[t] + (1 - alpha) * v[t-1]
//! Lookback: period - 1.

use super::{mask_warmup, Indicator};

/// Raw exponential smoothing recurrence, seeded with the first input.
///
/// Every position is computed; no warm-up masking. A period of 0 is treated
/// as 1 (identity).
pub fn exponential_smoothing(values: &[f64], period: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };
    let alpha = 2.0 / (period.max(1) as f64 + 1.0);

    let mut result = Vec::with_capacity(values.len());
    result.push(first);
    let mut prev = first;
    for &x in &values[1..] {
        let v = alpha * x + (1.0 - alpha) * prev;
        result.push(v);
        prev = v;
    }
    result
}

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }

    /// Same transform under a caller-chosen binding name.
    pub fn named(period: usize, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::new(period)
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        let mut result = exponential_smoothing(values, self.period);
        mask_warmup(&mut result, self.lookback());
        result
    }
}
