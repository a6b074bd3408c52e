//! McGinley Dynamic: adaptive, volatility-scaled smoothing.
//!
//! v[0] = x[0]
//! v[t] = v[t-1] + (x[t] - v[t-1]) / max(1, min(2p, (x[t] / v[t-1])^4))
//! Lookback: period - 1.
//!
//! Divisor policy: the divisor is clamped to `[1, 2p]`. Without the lower
//! bound a falling price drives the quartic ratio towards zero and the step
//! overshoots (or divides by zero when x[t] == 0). A previous value of zero
//! gives an infinite ratio, which the upper bound turns into 2p.

use super::{mask_warmup, Indicator};

/// Clamped divisor for one McGinley step.
pub fn dynamic_divisor(price: f64, prev: f64, period: usize) -> f64 {
    let ceiling = 2.0 * period.max(1) as f64;
    let ratio = (price / prev).powi(4);
    ratio.min(ceiling).max(1.0)
}

/// Raw adaptive smoothing recurrence, seeded with the first input.
pub fn adaptive_smoothing(values: &[f64], period: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };

    let mut result = Vec::with_capacity(values.len());
    result.push(first);
    let mut prev = first;
    for &x in &values[1..] {
        let v = prev + (x - prev) / dynamic_divisor(x, prev, period);
        result.push(v);
        prev = v;
    }
    result
}

#[derive(Debug, Clone)]
pub struct McGinley {
    period: usize,
    name: String,
}

impl McGinley {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "McGinley period must be >= 1");
        Self {
            period,
            name: format!("mcginley_{period}"),
        }
    }

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

impl Indicator for McGinley {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        let mut result = adaptive_smoothing(values, self.period);
        mask_warmup(&mut result, self.lookback());
        result
    }
}
