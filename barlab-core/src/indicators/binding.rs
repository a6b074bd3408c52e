//! Indicator binding: aligning precomputed series to the price series index.
//!
//! Bound values are shared read-only (`Arc<[f64]>`), so independent runs over
//! the same series can reuse one computation. `NaN` marks an undefined
//! (warm-up) position; nothing is forward-filled.

use crate::domain::PriceSeries;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("indicator '{name}' has {actual} values but the price series has {expected} bars")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("indicator '{0}' is already bound")]
    Duplicate(String),

    #[error("indicator '{0}' is not bound")]
    Unknown(String),
}

/// A named indicator series aligned one-to-one with a price series.
#[derive(Debug, Clone)]
pub struct IndicatorHandle {
    name: String,
    values: Arc<[f64]>,
}

impl IndicatorHandle {
    /// Bind `values` to `series`. Lengths must match exactly.
    pub fn bind(
        name: impl Into<String>,
        values: Vec<f64>,
        series: &PriceSeries,
    ) -> Result<Self, BindError> {
        let name = name.into();
        if values.len() != series.len() {
            return Err(BindError::LengthMismatch {
                name,
                expected: series.len(),
                actual: values.len(),
            });
        }
        Ok(Self {
            name,
            values: values.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`, or `None` for warm-up positions and out-of-range
    /// indices.
    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().filter(|v| !v.is_nan())
    }

    /// First index holding a defined value.
    pub fn first_defined(&self) -> Option<usize> {
        self.values.iter().position(|v| !v.is_nan())
    }

    /// Lagged view over positions `0..=index`.
    pub fn view_up_to(&self, index: usize) -> IndicatorView<'_> {
        let end = index.saturating_add(1).min(self.values.len());
        IndicatorView {
            name: &self.name,
            values: &self.values[..end],
        }
    }
}

/// Read-only prefix of an indicator, ending at the current bar.
///
/// `ago(0)` is the current bar, `ago(1)` the previous one, and so on.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorView<'a> {
    name: &'a str,
    values: &'a [f64],
}

impl<'a> IndicatorView<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn current(&self) -> Option<f64> {
        self.ago(0)
    }

    pub fn ago(&self, bars: usize) -> Option<f64> {
        let idx = self.values.len().checked_sub(bars + 1)?;
        let v = self.values[idx];
        (!v.is_nan()).then_some(v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &'a [f64] {
        self.values
    }
}

/// All indicators bound for one run, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSet {
    handles: BTreeMap<String, IndicatorHandle>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: IndicatorHandle) -> Result<(), BindError> {
        if self.handles.contains_key(handle.name()) {
            return Err(BindError::Duplicate(handle.name.clone()));
        }
        self.handles.insert(handle.name.clone(), handle);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&IndicatorHandle> {
        self.handles.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handles.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// First bar index at which every bound indicator is defined.
    ///
    /// Returns `series_len` when some indicator is never defined, so the
    /// bar loop runs zero times.
    pub fn warmup_end(&self, series_len: usize) -> usize {
        self.handles
            .values()
            .map(|h| h.first_defined().unwrap_or(series_len))
            .max()
            .unwrap_or(0)
            .min(series_len)
    }
}
