//! Strategy contract and concrete strategies.
//!
//! A strategy has two hooks:
//! - `initialize` runs once before the bar loop and binds the indicators the
//!   strategy needs.
//! - `on_bar` runs once per bar, after the close is known, and returns the
//!   order intents for that bar.
//!
//! # Architecture invariant
//! `on_bar` only receives a [`BarContext`], which exposes bars and indicator
//! values up to and including the current index. There is no API that reaches
//! past it.

pub mod buy_and_hold;
pub mod ema_cross;

pub use buy_and_hold::BuyAndHold;
pub use ema_cross::{EmaCrossMcGinley, EmaCrossParams};

use crate::domain::{Bar, OrderIntent, Position, PriceSeries};
use crate::engine::broker::Broker;
use crate::indicators::{BindError, Indicator, IndicatorHandle, IndicatorSet, IndicatorView};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error type returned by strategy hooks. Any error converts into it with `?`.
pub type StrategyFault = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The decision contract every concrete strategy implements.
pub trait Strategy: Send {
    /// Human-readable name (e.g., "ema_cross_mcginley").
    fn name(&self) -> &str;

    /// Called once before the loop starts.
    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> Result<(), StrategyFault>;

    /// Called once per processed bar. Intents are settled in the order returned.
    fn on_bar(&mut self, ctx: &BarContext<'_>) -> Result<Vec<OrderIntent>, StrategyFault>;
}

/// Context handed to [`Strategy::initialize`].
///
/// Indicator transforms are causal, so computing them over the whole series
/// up front does not leak future data into past values.
pub struct InitContext<'a> {
    series: &'a PriceSeries,
    closes: Vec<f64>,
    indicators: &'a mut IndicatorSet,
}

impl<'a> InitContext<'a> {
    pub(crate) fn new(series: &'a PriceSeries, indicators: &'a mut IndicatorSet) -> Self {
        Self {
            series,
            closes: series.closes(),
            indicators,
        }
    }

    pub fn series(&self) -> &PriceSeries {
        self.series
    }

    /// Compute `indicator` over the close prices and bind it under its name.
    pub fn compute(&mut self, indicator: &dyn Indicator) -> Result<(), BindError> {
        let values = indicator.compute(&self.closes);
        self.bind(indicator.name(), values)
    }

    /// Bind raw values under `name`.
    pub fn bind(&mut self, name: &str, values: Vec<f64>) -> Result<(), BindError> {
        let handle = IndicatorHandle::bind(name, values, self.series)?;
        self.indicators.insert(handle)
    }

    /// Fail unless `name` was bound, either by the caller or by this hook.
    pub fn require(&self, name: &str) -> Result<(), BindError> {
        if self.indicators.contains(name) {
            Ok(())
        } else {
            Err(BindError::Unknown(name.to_string()))
        }
    }
}

/// Context handed to [`Strategy::on_bar`], bounded to the current index.
pub struct BarContext<'a> {
    index: usize,
    bars: &'a [Bar],
    indicators: &'a IndicatorSet,
    broker: &'a Broker,
}

impl<'a> BarContext<'a> {
    pub(crate) fn new(
        index: usize,
        series: &'a PriceSeries,
        indicators: &'a IndicatorSet,
        broker: &'a Broker,
    ) -> Self {
        Self {
            index,
            bars: series.slice_up_to(index),
            indicators,
            broker,
        }
    }

    /// Index of the current bar in the price series.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Bars `0..=index`.
    pub fn bars(&self) -> &'a [Bar] {
        self.bars
    }

    pub fn bar(&self) -> &'a Bar {
        &self.bars[self.bars.len() - 1]
    }

    pub fn close(&self) -> f64 {
        self.bar().close
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.bar().timestamp
    }

    /// Lagged view of a bound indicator, ending at the current bar.
    pub fn indicator(&self, name: &str) -> Option<IndicatorView<'a>> {
        self.indicators.get(name).map(|h| h.view_up_to(self.index))
    }

    /// Like [`indicator`](Self::indicator) but an unknown name is an error.
    pub fn require(&self, name: &str) -> Result<IndicatorView<'a>, BindError> {
        self.indicator(name)
            .ok_or_else(|| BindError::Unknown(name.to_string()))
    }

    pub fn cash(&self) -> f64 {
        self.broker.cash()
    }

    pub fn position(&self) -> &'a Position {
        self.broker.position()
    }

    /// Account equity marked at the current close.
    pub fn equity(&self) -> f64 {
        self.broker.equity(self.close())
    }
}

/// Serializable strategy selection, resolved once at run construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StrategyConfig {
    /// Fast/slow EMA crossover confirmed by a McGinley Dynamic trend line.
    #[serde(rename = "EMA_CROSS_MCGINLEY")]
    EmaCrossMcGinley(EmaCrossParams),

    /// Buy on the first processed bar and hold.
    #[serde(rename = "BUY_AND_HOLD")]
    BuyAndHold,
}

impl StrategyConfig {
    pub fn build(&self) -> Box<dyn Strategy> {
        match self {
            Self::EmaCrossMcGinley(params) => Box::new(EmaCrossMcGinley::new(params.clone())),
            Self::BuyAndHold => Box::new(BuyAndHold::new()),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::EmaCrossMcGinley(p) => format!(
                "ema_cross_mcginley({},{},{})",
                p.fast_period, p.slow_period, p.trend_period
            ),
            Self::BuyAndHold => "buy_and_hold".to_string(),
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::EmaCrossMcGinley(EmaCrossParams::default())
    }
}
