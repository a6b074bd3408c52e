//! PriceSeries: validated, immutable, time-ordered bars.
//!
//! The series is the simulation clock: the engine walks it by index and
//! every lagged view handed to a strategy is a prefix of it.

use super::bar::Bar;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Reasons a bar sequence cannot become a [`PriceSeries`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("price series is empty")]
    Empty,

    #[error("bar {index} ({timestamp}): prices must be finite and positive")]
    InvalidPrice {
        index: usize,
        timestamp: DateTime<Utc>,
    },

    #[error("bar {index} ({timestamp}): volume must be finite and non-negative, got {volume}")]
    InvalidVolume {
        index: usize,
        timestamp: DateTime<Utc>,
        volume: f64,
    },

    #[error("bar {index} ({timestamp}): low {low} is above high {high}")]
    LowAboveHigh {
        index: usize,
        timestamp: DateTime<Utc>,
        low: f64,
        high: f64,
    },

    #[error("bar {index}: duplicate timestamp {timestamp}")]
    DuplicateTimestamp {
        index: usize,
        timestamp: DateTime<Utc>,
    },

    #[error("bar {index}: timestamp {timestamp} precedes previous bar at {previous}")]
    NonMonotonic {
        index: usize,
        previous: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
}

/// Ordered OHLCV bars with unique, strictly ascending timestamps.
///
/// Gaps between timestamps are tolerated and never filled.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Validate and wrap a bar sequence.
    ///
    /// A bar whose open or close falls outside `[low, high]` is accepted
    /// with a warning; everything else listed in [`SeriesError`] is fatal.
    pub fn load(bars: Vec<Bar>) -> Result<Self, SeriesError> {
        if bars.is_empty() {
            return Err(SeriesError::Empty);
        }

        let mut outside_range = 0usize;
        for (index, bar) in bars.iter().enumerate() {
            if !bar.has_valid_prices() {
                return Err(SeriesError::InvalidPrice {
                    index,
                    timestamp: bar.timestamp,
                });
            }
            if !bar.volume.is_finite() || bar.volume < 0.0 {
                return Err(SeriesError::InvalidVolume {
                    index,
                    timestamp: bar.timestamp,
                    volume: bar.volume,
                });
            }
            if bar.low > bar.high {
                return Err(SeriesError::LowAboveHigh {
                    index,
                    timestamp: bar.timestamp,
                    low: bar.low,
                    high: bar.high,
                });
            }
            if !bar.body_within_range() {
                outside_range += 1;
                tracing::warn!(
                    index,
                    timestamp = %bar.timestamp,
                    open = bar.open,
                    close = bar.close,
                    low = bar.low,
                    high = bar.high,
                    "bar open/close outside its low-high range"
                );
            }
            if index > 0 {
                let previous = bars[index - 1].timestamp;
                if bar.timestamp == previous {
                    return Err(SeriesError::DuplicateTimestamp {
                        index,
                        timestamp: bar.timestamp,
                    });
                }
                if bar.timestamp < previous {
                    return Err(SeriesError::NonMonotonic {
                        index,
                        previous,
                        timestamp: bar.timestamp,
                    });
                }
            }
        }

        tracing::debug!(bars = bars.len(), outside_range, "price series loaded");
        Ok(Self { bars })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false for a loaded series; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bar_at(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    /// Bars `0..=index`. Indices past the end clamp to the full series.
    pub fn slice_up_to(&self, index: usize) -> &[Bar] {
        let end = index.saturating_add(1).min(self.bars.len());
        &self.bars[..end]
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Close prices, in series order. Input for indicator transforms.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.bars.iter().map(|b| b.timestamp)
    }

    pub fn first(&self) -> &Bar {
        &self.bars[0]
    }

    pub fn last(&self) -> &Bar {
        &self.bars[self.bars.len() - 1]
    }
}
