//! Bar-by-bar event loop.
//!
//! Per processed bar:
//! 1. Build a context bounded to bars `0..=i`
//! 2. Ask the strategy for order intents
//! 3. Settle each intent at bar `i`'s close, in the order returned
//! 4. Record equity marked at bar `i`'s close
//!
//! Bars before the warm-up end (the first index where every bound indicator
//! is defined) are skipped entirely.

use super::broker::Broker;
use super::state::{BacktestConfig, EngineError, EquityPoint, RunResult};
use crate::domain::PriceSeries;
use crate::indicators::{BindError, IndicatorHandle, IndicatorSet};
use crate::strategy::{BarContext, InitContext, Strategy};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

/// A configured backtest over one price series.
///
/// `run` borrows `self` immutably, so one `Backtest` can drive several
/// strategies; each run gets a fresh account.
#[derive(Debug, Clone)]
pub struct Backtest {
    series: Arc<PriceSeries>,
    config: BacktestConfig,
    indicators: IndicatorSet,
}

impl Backtest {
    pub fn new(series: Arc<PriceSeries>, config: BacktestConfig) -> Self {
        Self {
            series,
            config,
            indicators: IndicatorSet::new(),
        }
    }

    /// Pre-bind an indicator computed outside the strategy.
    pub fn with_indicator(mut self, handle: IndicatorHandle) -> Result<Self, EngineError> {
        if handle.len() != self.series.len() {
            return Err(BindError::LengthMismatch {
                name: handle.name().to_string(),
                expected: self.series.len(),
                actual: handle.len(),
            }
            .into());
        }
        self.indicators.insert(handle)?;
        Ok(self)
    }

    pub fn series(&self) -> &PriceSeries {
        &self.series
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run `strategy` over the series.
    ///
    /// Order rejections are recorded and the run continues. A strategy error
    /// aborts the run; no partial result is returned.
    pub fn run(&self, strategy: &mut dyn Strategy) -> Result<RunResult, EngineError> {
        self.config.validate()?;

        let span = info_span!("backtest", strategy = strategy.name(), bars = self.series.len());
        let _guard = span.enter();

        let series = self.series.as_ref();
        let mut indicators = self.indicators.clone();
        strategy
            .initialize(&mut InitContext::new(series, &mut indicators))
            .map_err(|source| EngineError::StrategyInit {
                strategy: strategy.name().to_string(),
                source,
            })?;

        let warmup = indicators.warmup_end(series.len());
        if warmup >= series.len() {
            warn!(
                warmup,
                bars = series.len(),
                "series is shorter than the indicator warm-up; nothing to process"
            );
            return Ok(RunResult::empty(
                strategy.name(),
                self.config.starting_cash,
                warmup,
            ));
        }

        let mut broker = Broker::new(
            self.config.starting_cash,
            self.config.commission_rate,
            self.config.exclusive_orders,
        );
        let mut equity_curve = Vec::with_capacity(series.len() - warmup);

        for (i, bar) in series.bars().iter().enumerate().skip(warmup) {
            let intents = {
                let ctx = BarContext::new(i, series, &indicators, &broker);
                strategy
                    .on_bar(&ctx)
                    .map_err(|source| EngineError::Strategy {
                        bar_index: i,
                        timestamp: bar.timestamp,
                        source,
                    })?
            };

            for intent in intents {
                if let Err(rejected) = broker.submit(intent, i, bar.timestamp, bar.close) {
                    debug!(bar_index = i, %rejected, "order rejected");
                }
            }

            equity_curve.push(EquityPoint {
                timestamp: bar.timestamp,
                equity: broker.equity(bar.close),
                exposed: !broker.position().is_flat(),
            });
        }

        let last = series.last();
        if self.config.close_on_finish {
            let index = series.len() - 1;
            if let Err(rejected) = broker.close_position(index, last.timestamp, last.close) {
                debug!(bar_index = index, %rejected, "finish liquidation rejected");
            }
            if let Some(point) = equity_curve.last_mut() {
                point.equity = broker.equity(last.close);
                point.exposed = !broker.position().is_flat();
            }
        }

        let final_price = last.close;
        let result = RunResult {
            strategy: strategy.name().to_string(),
            trades: broker.trades().to_vec(),
            orders: broker.orders().to_vec(),
            starting_cash: self.config.starting_cash,
            final_cash: broker.cash(),
            final_equity: broker.equity(final_price),
            open_position: (!broker.position().is_flat()).then(|| broker.position().clone()),
            warmup_bars: warmup,
            bars_processed: equity_curve.len(),
            equity_curve,
        };

        info!(
            warmup_bars = result.warmup_bars,
            bars_processed = result.bars_processed,
            trades = result.trades.len(),
            rejected = result.rejected_orders(),
            final_equity = result.final_equity,
            "backtest finished"
        );
        Ok(result)
    }
}
