//! Bar: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped OHLCV record.
///
/// Bars are immutable once ingested into a [`PriceSeries`](super::PriceSeries).
/// The interval is whatever the caller's data has (daily, 15 minute, ...);
/// the engine only relies on timestamps being strictly ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// True if every price is finite and strictly positive.
    pub fn has_valid_prices(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| p.is_finite() && *p > 0.0)
    }

    /// True if open and close both lie inside `[low, high]`.
    ///
    /// A bar can pass validation while failing this check; the series
    /// loader only warns about it.
    pub fn body_within_range(&self) -> bool {
        self.low <= self.open
            && self.open <= self.high
            && self.low <= self.close
            && self.close <= self.high
    }
}
